use super::*;
use crate::wikitext::codemap::FileMap;

mod extras;
mod scenarios;

const BASE_DIR: &str = "./src/wikitext/tests";

macro_rules! run_tests {
    ($($name:ident),* $(,)?) => {
        $(#[test]
        fn $name() {
            run_golden_test(
                stringify!($name),
                include_str!(concat!("./documents/", stringify!($name), ".txt"))
            );
        })*
    }
}

/// Parses `input`, checks that it round-trips, and returns the tree.
#[track_caller]
fn run_test(input: &str) -> Wikicode {
    let _ = env_logger::try_init();

    let result = Parser::new(&ParserConfig {
        backend: TokenizerBackend::Checked,
    })
    .parse(input, Context::empty(), false)
    .unwrap();
    if let Err(err) = check_round_trip(input, &result) {
        panic!("{err}\n{:#?}", inspect(&FileMap::new(input), &result));
    }
    result
}

#[track_caller]
fn run_golden_test(test_name: &str, input: &str) {
    use std::io::Write as _;

    let mut mint = goldenfile::Mint::new(format!("{BASE_DIR}/goldenfiles"));
    let mut file = mint.new_goldenfile(format!("{test_name}.txt")).unwrap();
    let result = run_test(input);
    let _ = writeln!(file, "{:#?}", inspect(&FileMap::new(input), &result));
}

run_tests! {
    heading_and_list,
    links,
    styles,
    table,
    template,
}
