use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use cyrepl::app::batch::{self, BatchAction};
use cyrepl::app::console::Console;
use cyrepl::app::Session;
use cyrepl::channel::evaluator::Evaluator;
use cyrepl::channel::inject::{self, CommandInjector, InjectError};
use cyrepl::channel::{agent, ExecutionChannel, RemoteAddress};
use cyrepl::config::Config;
use cyrepl::config_io::DirectoryContext;
use cyrepl::input::history::History;
use cyrepl::input::reader::{poll_terminal, LineReader};
use cyrepl::primitives::highlighter::{Highlighter, JsHighlighter, PlainHighlighter};
use cyrepl::primitives::parser::{CompileOptions, JsParser};
use cyrepl::services::{log_dirs, signal_handler, terminal_modes, tracing_setup};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

/// Interactive console for live code injection
#[derive(Parser, Debug)]
#[command(name = "cyrepl")]
#[command(about = "Multi-line JavaScript console for local or injected evaluation", long_about = None)]
#[command(version)]
struct Args {
    /// Print the generated code instead of running it
    #[arg(short = 'c', long)]
    compile: bool,

    /// Generate minified code
    #[arg(short = 'n', long)]
    minify: bool,

    /// Prefix generated code with "use strict"
    #[arg(short = 's', long)]
    strict: bool,

    /// Attach to a running process by injection
    #[arg(short = 'p', long, value_name = "PID|NAME")]
    pid: Option<String>,

    /// Connect to a listening agent
    #[arg(short = 'r', long, value_name = "HOST:PORT|unix:PATH")]
    remote: Option<String>,

    /// Raise log verbosity (repeatable)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log file path
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Run as the agent end of the protocol on a Unix socket
    #[arg(long, value_name = "SOCKET")]
    agent: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,

    /// Script to run, or `-` for standard input
    #[arg(value_name = "SCRIPT")]
    script: Option<String>,

    /// Arguments exposed to the script as `system.args`
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Args {
    /// Checks clap cannot express with the messages users expect.
    fn validate(&self) -> Result<(), String> {
        let selected = [self.compile, self.pid.is_some(), self.remote.is_some()]
            .iter()
            .filter(|&&set| set)
            .count();
        if selected > 1 {
            return Err("only one of -[cpr] may be used at a time".to_string());
        }
        if self.pid.is_some() && !self.args.is_empty() {
            return Err("-p cannot set argv".to_string());
        }
        if let Some(remote) = &self.remote {
            remote.parse::<RemoteAddress>().map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            minify: self.minify,
            strict: self.strict,
        }
    }

    /// `system.args`: the script path followed by its arguments.
    fn script_args(&self) -> Vec<String> {
        self.script.iter().chain(self.args.iter()).cloned().collect()
    }

    fn is_batch(&self) -> bool {
        self.compile || self.script.is_some() || !io::stdin().is_terminal()
    }
}

fn initialize_app(args: &Args) -> AnyhowResult<()> {
    let log_path = args.log_file.clone().unwrap_or_else(log_dirs::main_log_path);
    let fallback = std::env::temp_dir().join(format!("cyrepl-{}.log", std::process::id()));
    match tracing_setup::open_log_file(&log_path, &fallback) {
        Some((file, used)) => {
            if used != log_path {
                eprintln!(
                    "cyrepl: cannot write log file {}, logging to {}",
                    log_path.display(),
                    used.display()
                );
            }
            tracing_setup::init_global(file, args.verbose);
        }
        None => eprintln!(
            "cyrepl: cannot write log file {}, logging disabled",
            log_path.display()
        ),
    }

    // Clean up stale log files from dead processes on startup
    log_dirs::cleanup_stale_logs();

    tracing::info!("cyrepl starting");

    signal_handler::install_signal_handlers().context("Failed to install SIGINT handler")?;

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        terminal_modes::emergency_cleanup();
        original_hook(panic);
    }));

    Ok(())
}

#[cfg(feature = "local-eval")]
fn local_evaluator(script_args: Vec<String>) -> AnyhowResult<Box<dyn Evaluator>> {
    let evaluator = cyrepl::channel::evaluator::QuickJsEvaluator::new(script_args)?;
    Ok(Box::new(evaluator))
}

#[cfg(not(feature = "local-eval"))]
fn local_evaluator(_script_args: Vec<String>) -> AnyhowResult<Box<dyn Evaluator>> {
    anyhow::bail!("built without local evaluation; attach with -p or -r")
}

/// Establish the execution target selected on the command line.
fn open_channel(args: &Args, config: &Config) -> AnyhowResult<ExecutionChannel> {
    if let Some(spec) = &args.pid {
        let pid = inject::resolve_process(spec)?;
        let library = config.inject.library.as_deref().ok_or(InjectError::NoLibrary)?;
        let socket_dir = config
            .inject
            .socket_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let mut injector = CommandInjector::new(config.inject.command.clone());
        let stream = inject::attach(pid, library, &socket_dir, &mut injector)
            .with_context(|| format!("Failed to attach to process {}", pid))?;
        return Ok(ExecutionChannel::remote(Box::new(stream)));
    }

    if let Some(spec) = &args.remote {
        let address: RemoteAddress = spec.parse()?;
        return Ok(ExecutionChannel::connect(&address)?);
    }

    Ok(ExecutionChannel::local(local_evaluator(args.script_args())?))
}

fn highlighter(config: &Config) -> AnyhowResult<Box<dyn Highlighter>> {
    if config.highlight {
        Ok(Box::new(JsHighlighter::new()?))
    } else {
        Ok(Box::new(PlainHighlighter))
    }
}

fn run_batch(args: &Args, config: &Config) -> AnyhowResult<i32> {
    let source = match args.script.as_deref() {
        Some(path) if path != "-" => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?
        }
        _ => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read standard input")?;
            source
        }
    };

    let mut parser = JsParser::new()?;
    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();

    if args.compile {
        return batch::run(
            &source,
            &mut parser,
            args.compile_options(),
            BatchAction::Print,
            &mut out,
            &mut err,
        );
    }

    let mut channel = open_channel(args, config)?;
    batch::run(
        &source,
        &mut parser,
        args.compile_options(),
        BatchAction::Run(&mut channel),
        &mut out,
        &mut err,
    )
}

fn run_console(args: &Args, config: &Config, dir_context: &DirectoryContext) -> AnyhowResult<i32> {
    let history_path = dir_context.history_path(config);
    if config.history.file.is_none() {
        dir_context
            .ensure_state_dir()
            .context("Failed to create state directory")?;
    }
    let history = History::load(
        &history_path,
        config.history.persistence,
        config.history.max_entries,
    )
    .with_context(|| format!("Failed to load history from {}", history_path.display()))?;

    let channel = open_channel(args, config)?;
    let session = Session::new(
        Box::new(JsParser::new()?),
        highlighter(config)?,
        history,
        channel,
        args.compile_options(),
    );
    let reader = LineReader::new(config.prompt.clone(), highlighter(config)?);
    let colorize = config.highlight && io::stdout().is_terminal();
    let mut console = Console::new(session, reader, colorize);

    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();
    console.run(&mut out, &mut err, poll_terminal, true)?;

    console
        .session_mut()
        .history
        .close()
        .context("Failed to save history")?;

    // Conventional exit status for death by signal
    Ok(signal_handler::CONTROLLER
        .pending_termination()
        .map_or(0, |signal| 128 + signal))
}

fn real_main() -> AnyhowResult<i32> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return Ok(code);
        }
    };
    if let Err(message) = args.validate() {
        eprintln!("{}", message);
        return Ok(1);
    }

    initialize_app(&args)?;

    let dir_context = DirectoryContext::from_system()?;
    let config = Config::load(&dir_context, args.config.as_deref())
        .context("Failed to load configuration")?;

    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(0);
    }

    if let Some(socket) = &args.agent {
        let mut evaluator = local_evaluator(args.script_args())?;
        agent::run(socket, evaluator.as_mut())?;
        return Ok(0);
    }

    if args.is_batch() {
        return run_batch(&args, &config);
    }

    run_console(&args, &config, &dir_context)
}

fn main() {
    let code = match real_main() {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Fatal: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("cyrepl").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_exclusive_modes() {
        let err = parse(&["-c", "-r", "host:1"]).validate().unwrap_err();
        assert_eq!(err, "only one of -[cpr] may be used at a time");
        assert!(parse(&["-c", "script.js"]).validate().is_ok());
    }

    #[test]
    fn test_pid_cannot_set_argv() {
        let err = parse(&["-p", "123", "script.js", "a"]).validate().unwrap_err();
        assert_eq!(err, "-p cannot set argv");
    }

    #[test]
    fn test_remote_needs_port() {
        let err = parse(&["-r", "localhost"]).validate().unwrap_err();
        assert_eq!(err, "missing colon in hostspec");
    }

    #[test]
    fn test_script_args_follow_script() {
        let args = parse(&["-v", "-v", "s.js", "--flag", "x"]);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.script_args(), ["s.js", "--flag", "x"]);
    }
}
