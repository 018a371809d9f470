use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{info, warn};

use mlang_py::backends::BackendType;
use mlang_py::config::{Config, UnsupportedPolicy};
use mlang_py::error::{CompileError, Diagnostic, StderrSink};
use mlang_py::parser::{lexer, parser as syntax};
use mlang_py::wire;

#[derive(Parser)]
#[command(name = "mlang-py")]
#[command(about = "Compiler from a small typed scripting language to Python", version)]
struct Cli {
    /// Подробный лог (можно переопределить через RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Компилирует исходник целиком, без промежуточных файлов
    Compile {
        /// Исходник
        input: String,

        /// Нужный язык на выходе
        #[arg(short, long, default_value = "python")]
        target: String,

        /// Выходной файл, по умолчанию рядом с исходником
        #[arg(short, long)]
        output: Option<String>,

        /// Показать токены
        #[arg(long)]
        show_tokens: bool,

        /// Показать ast
        #[arg(long)]
        show_ast: bool,

        /// Не упрощать выражения
        #[arg(long)]
        no_simplify: bool,

        /// Перевод строки внутри строки - ошибка
        #[arg(long)]
        strict_strings: bool,

        /// Неподдерживаемые конструкции - ошибка, а не предупреждение
        #[arg(long)]
        strict: bool,
    },

    /// Только лексер: исходник -> дамп токенов
    Lex {
        input: String,

        #[arg(short, long)]
        output: Option<String>,

        #[arg(long)]
        strict_strings: bool,
    },

    /// Дамп токенов -> дамп ast
    Parse {
        input: String,

        #[arg(short, long)]
        output: Option<String>,

        #[arg(long)]
        strict: bool,
    },

    /// Дамп ast -> код на целевом языке
    Generate {
        input: String,

        #[arg(short, long, default_value = "python")]
        target: String,

        #[arg(short, long)]
        output: Option<String>,

        #[arg(long)]
        no_simplify: bool,
    },

    /// Список поддерживаемых языков
    Targets,
}

impl Commands {
    fn input(&self) -> &str {
        match self {
            Self::Compile { input, .. }
            | Self::Lex { input, .. }
            | Self::Parse { input, .. }
            | Self::Generate { input, .. } => input,
            Self::Targets => "",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut sink = StderrSink::default();
    let filename = cli.command.input().to_string();

    match run(cli.command, &mut sink) {
        Ok(()) => {
            if sink.errors > 0 {
                warn!("finished with {} errors, {} warnings", sink.errors, sink.warnings);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_fatal(&filename, &err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, sink: &mut StderrSink) -> Result<(), CompileError> {
    match command {
        Commands::Compile {
            input,
            target,
            output,
            show_tokens,
            show_ast,
            no_simplify,
            strict_strings,
            strict,
        } => {
            let backend_type = BackendType::from_name(&target)?;
            let mut config = Config::default().with_filename(&input);
            config.lexer.strict_strings = strict_strings;
            config.parser.unsupported = policy(strict);
            config.codegen.simplify = !no_simplify;

            info!("compiling {} for {}", input, backend_type.name());
            let source = fs::read_to_string(&input)?;

            let tokens = lexer::tokenize_with(&source, &config.lexer, sink);
            if show_tokens {
                println!("=== TOKENS ===");
                print!("{}", wire::tokens::write_tokens(&tokens));
            }

            let program = syntax::parse_tokens_with(tokens, &config.parser, sink)?;
            if show_ast {
                println!("=== AST ===");
                print!("{}", wire::ast::write_program(&program));
            }

            let mut backend = backend_type.create(&config.codegen);
            let code = backend.generate(&program)?;

            let output_path = match output {
                Some(path) => path,
                None => Path::new(&input)
                    .with_extension(backend_type.extension())
                    .to_string_lossy()
                    .into_owned(),
            };
            fs::write(&output_path, &code)?;
            println!("Compiled to: {}", output_path);
        }
        Commands::Lex {
            input,
            output,
            strict_strings,
        } => {
            let mut config = Config::default().with_filename(&input);
            config.lexer.strict_strings = strict_strings;

            let source = fs::read_to_string(&input)?;
            let tokens = lexer::tokenize_with(&source, &config.lexer, sink);
            write_output(output.as_deref(), &wire::tokens::write_tokens(&tokens))?;
        }
        Commands::Parse {
            input,
            output,
            strict,
        } => {
            let mut config = Config::default().with_filename(&input);
            config.parser.unsupported = policy(strict);

            let dump = fs::read_to_string(&input)?;
            let tokens = wire::tokens::read_tokens(&dump, &input, sink)?;
            let program = syntax::parse_tokens_with(tokens, &config.parser, sink)?;
            write_output(output.as_deref(), &wire::ast::write_program(&program))?;
        }
        Commands::Generate {
            input,
            target,
            output,
            no_simplify,
        } => {
            let backend_type = BackendType::from_name(&target)?;
            let mut config = Config::default().with_filename(&input);
            config.codegen.simplify = !no_simplify;

            let dump = fs::read_to_string(&input)?;
            let program = wire::ast::read_program(&dump)?;
            let code = backend_type.create(&config.codegen).generate(&program)?;
            write_output(output.as_deref(), &code)?;
        }
        Commands::Targets => {
            println!("Supported targets:");
            for backend in BackendType::all() {
                println!("  {:8} - {}", backend.name(), backend.description());
            }
        }
    }

    Ok(())
}

fn policy(strict: bool) -> UnsupportedPolicy {
    if strict {
        UnsupportedPolicy::Error
    } else {
        UnsupportedPolicy::Report
    }
}

fn write_output(path: Option<&str>, text: &str) -> Result<(), CompileError> {
    match path {
        Some(path) => {
            fs::write(path, text)?;
            info!("wrote {} bytes to {}", text.len(), path);
        }
        None => print!("{}", text),
    }
    Ok(())
}

/// Синтаксическая ошибка печатается как обычная диагностика с позицией.
fn report_fatal(filename: &str, err: &CompileError) {
    match err {
        CompileError::SyntaxError {
            line,
            column,
            message,
        } => eprintln!("{}", Diagnostic::error(filename, *line, *column, message.clone())),
        _ => eprintln!("error: {}", err),
    }
}
