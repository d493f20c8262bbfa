use std::io::{self, BufWriter, Read};

use anyhow::{anyhow, Result};

use sccc::{lexer, parser};

fn main() -> Result<()> {
    let mut source = String::new();
    io::stdin().read_to_string(&mut source)?;

    let tokens =
        lexer::lex(&source).map_err(|err| anyhow!("line {}: {err}", err.get_ln()))?;

    let output = BufWriter::new(io::stdout().lock());
    let diagnostics = io::stderr().lock();
    parser::parse(&tokens, output, diagnostics).map_err(|err| anyhow!("{err}"))?;

    Ok(())
}
