use argh::FromArgs;
use job_shell::{Interpreter, ShellConfig};

#[derive(FromArgs)]
/// A minimal interactive shell that runs commands in the foreground or, with a
/// trailing `&`, in the background.
struct Args {
    #[argh(option)]
    /// longest accepted input line, in bytes
    max_line_len: Option<usize>,

    #[argh(option)]
    /// longest accepted token, in bytes
    max_token_len: Option<usize>,

    #[argh(option)]
    /// most tokens accepted on one line
    max_tokens: Option<usize>,

    #[argh(option)]
    /// number of hash buckets of the background process registry
    buckets: Option<usize>,

    #[argh(switch)]
    /// do not keep a history of entered lines
    no_history: bool,
}

impl Args {
    fn into_config(self) -> ShellConfig {
        let mut config = ShellConfig::default();
        if let Some(n) = self.max_line_len {
            config.limits.max_line_len = n;
        }
        if let Some(n) = self.max_token_len {
            config.limits.max_token_len = n;
        }
        if let Some(n) = self.max_tokens {
            config.limits.max_tokens = n;
        }
        if let Some(n) = self.buckets {
            config.registry_buckets = n;
        }
        config.history = !self.no_history;
        config
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = argh::from_env::<Args>().into_config();
    log::debug!("starting shell with {:?}", config);

    Interpreter::with_config(config).repl()?;
    Ok(())
}
