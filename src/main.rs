use anyhow::Context as _;
use either::Either;
use std::io::Read as _;
use wikitree::wikitext::{
    Context, FileMap, Parser, ParserConfig, TokenizerBackend, check_round_trip, inspect,
};

/// What to print.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    Tree,
    Tokens,
    Check,
}

fn usage<T>(err: &str) -> anyhow::Result<T> {
    let exe = std::env::args().next().unwrap_or_default();
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("Usage: {exe} [options] [FILE]\n");
    println!("Reads wikitext from FILE, or from standard input if FILE is absent or '-'.\n");
    println!("Options:");
    println!("    --tree: Print the node tree (default)");
    println!("    --tokens: Print the token stream");
    println!("    --json: With --tokens, print the token stream as JSON");
    println!("    --check: Verify that the tree formats back to the input");
    println!("    --context FLAG[,FLAG]: Initial tokenizer context");
    println!("    --skip-style-tags: Treat apostrophes as text");
    println!("    --tokenizer portable|checked: Tokenizer backend");
    println!("                                  (default: ${})\n", wikitree::wikitext::TOKENIZER_ENV);
    Err(anyhow::Error::msg(err.to_string()))
}

fn read_input(path: Option<&str>) -> anyhow::Result<String> {
    let mut reader = match path {
        None | Some("-") => Either::Left(std::io::stdin()),
        Some(path) => Either::Right(
            std::fs::File::open(path).with_context(|| format!("could not open {path}"))?,
        ),
    };
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .context("could not read input")?;
    Ok(text)
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        return usage("Help requested");
    }

    let mode = match (
        args.contains("--tree"),
        args.contains("--tokens"),
        args.contains("--check"),
    ) {
        (_, false, false) => Mode::Tree,
        (false, true, false) => Mode::Tokens,
        (false, false, true) => Mode::Check,
        _ => return usage("Only one of --tree, --tokens, and --check may be given"),
    };
    let json = args.contains("--json");
    let skip_style_tags = args.contains("--skip-style-tags");
    let context = match args.opt_value_from_str::<_, String>("--context")? {
        Some(names) => match Context::parse_names(&names) {
            Some(context) => context,
            None => return usage("Unknown context flag"),
        },
        None => Context::empty(),
    };
    let config = match args.opt_value_from_str::<_, TokenizerBackend>("--tokenizer")? {
        Some(backend) => ParserConfig { backend },
        None => ParserConfig::from_env(),
    };
    let _ = args.contains("--");
    let path = args.opt_free_from_str::<String>()?;

    if !args.finish().is_empty() {
        return usage("Unknown extra arguments passed");
    }

    let text = read_input(path.as_deref())?;
    let mut parser = Parser::new(&config);

    match mode {
        Mode::Tokens => {
            let tokens = parser.tokenize(&text, context, skip_style_tags)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tokens)?);
            } else {
                for token in tokens {
                    println!("{token:?}");
                }
            }
        }
        Mode::Tree => {
            let tree = parser.parse(&text, context, skip_style_tags)?;
            let input = FileMap::new(&text);
            println!("{:#?}", inspect(&input, &tree));
        }
        Mode::Check => {
            let tree = parser.parse(&text, context, skip_style_tags)?;
            check_round_trip(&text, &tree)?;
            log::info!("round trip ok ({} bytes)", text.len());
        }
    }

    Ok(())
}
