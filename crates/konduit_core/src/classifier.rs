//! Extraction of recognized flags from the templating tool's arguments.

/// Flags recognized in the downstream argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Values,
    PostRenderer,
    PostRendererArgs,
}

const VALUES_SHORT: &str = "-f";
const VALUES_LONG: &str = "--values";
const POST_RENDERER: &str = "--post-renderer";
const POST_RENDERER_ARGS: &str = "--post-renderer-args";

/// Downstream arguments with the recognized flags pulled out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedArgs {
    /// Unrecognized tokens in their original order.
    pub passthrough: Vec<String>,
    pub values: Vec<String>,
    pub post_renderer: Option<String>,
    pub post_renderer_args: Vec<String>,
}

impl ClassifiedArgs {
    /// Scan `args`.
    ///
    /// A flag in separate-value form takes the next token. With no next
    /// token the flag stays in the pass-through list so the downstream tool
    /// reports it.
    pub fn classify(args: &[String]) -> Self {
        let mut classified = Self::default();
        let mut tokens = args.iter();

        while let Some(arg) = tokens.next() {
            let matched = match inline_flag(arg) {
                Some(found) => Some(found),
                None => separate_flag(arg).and_then(|flag| {
                    tokens.next().map(|value| (flag, value.as_str()))
                }),
            };

            match matched {
                Some((flag, value)) => classified.record(flag, value),
                None => classified.passthrough.push(arg.clone()),
            }
        }

        classified
    }

    fn record(&mut self, flag: Flag, value: &str) {
        match flag {
            Flag::Values => self.values.push(value.to_string()),
            Flag::PostRenderer => {
                self.post_renderer = (!value.is_empty()).then(|| value.to_string());
            }
            Flag::PostRendererArgs => self.post_renderer_args.push(value.to_string()),
        }
    }
}

fn inline_flag(arg: &str) -> Option<(Flag, &str)> {
    let (name, value) = arg.split_once('=')?;
    separate_flag(name).map(|flag| (flag, value))
}

fn separate_flag(arg: &str) -> Option<Flag> {
    match arg {
        VALUES_SHORT | VALUES_LONG => Some(Flag::Values),
        POST_RENDERER => Some(Flag::PostRenderer),
        POST_RENDERER_ARGS => Some(Flag::PostRendererArgs),
        _ => None,
    }
}
