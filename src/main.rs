use std::env;
use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::process;

use anyhow::bail;
use anyhow::Context;
use log::info;

use pal8_rust::Assembler;
use pal8_rust::Options;
use pal8_rust::Outputs;

const USAGE: &str = "\
usage: pal8-rust [options] inputfile
  -d  dump the user symbol table
  -l  generate links for off-page references
  -p  write a re-loadable permanent symbol file
  -r  punch RIM format instead of BIN
  -x  print a cross-reference
  -v  print the version and exit
  -h  print this help";

struct Args {
    input: String,
    options: Options,
    permanent: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut input = None;
    let mut options = Options::default();
    let mut permanent = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-d" => options.dump_symbols = true,
            "-l" => options.generate_links = true,
            "-p" => permanent = true,
            "-r" => options.rim_format = true,
            "-x" => options.cross_reference = true,
            "-v" => {
                eprintln!("pal8-rust {}", env!("CARGO_PKG_VERSION"));
                process::exit(1);
            }
            "-h" => {
                eprintln!("{}", USAGE);
                process::exit(1);
            }
            _ if arg.starts_with('-') => bail!("unknown option {arg}\n{USAGE}"),
            _ => {
                if input.replace(arg).is_some() {
                    bail!("exactly one input file expected\n{USAGE}");
                }
            }
        }
    }
    match input {
        Some(input) => Ok(Args {
            input,
            options,
            permanent,
        }),
        None => bail!("no input file\n{USAGE}"),
    }
}

/// Swap the suffix after the last dot of the file name, or append one.
fn derived_name(input: &str, suffix: &str) -> String {
    let stem_end = match input.rfind('.') {
        Some(dot) if !input[dot..].contains('/') => dot,
        _ => input.len(),
    };
    format!("{}.{}", &input[..stem_end], suffix)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = parse_args()?;
    let source =
        fs::read_to_string(&args.input).with_context(|| format!("cannot read {}", args.input))?;

    let object_path = derived_name(
        &args.input,
        if args.options.rim_format { "rim" } else { "bin" },
    );
    let listing_path = derived_name(&args.input, "lst");
    let error_path = derived_name(&args.input, "err");

    let mut object = BufWriter::new(File::create(&object_path)?);
    let mut listing = BufWriter::new(File::create(&listing_path)?);
    let mut errors = BufWriter::new(File::create(&error_path)?);

    let summary = {
        let mut assembler = Assembler::new(
            &args.input,
            args.options.clone(),
            Outputs {
                object: &mut object,
                listing: &mut listing,
                errors: &mut errors,
            },
        );
        let summary = assembler.assemble(&source)?;
        if args.permanent {
            let path = derived_name(&args.input, "prm");
            let mut permanent = BufWriter::new(File::create(&path)?);
            assembler.write_permanent_symbols(&mut permanent)?;
            permanent.flush()?;
        }
        summary
    };

    object.flush()?;
    listing.flush()?;
    errors.flush()?;

    if summary.errors == 0 {
        fs::remove_file(&error_path).ok();
        info!("{}: no errors", args.input);
        Ok(())
    } else {
        info!("{}: {} errors", args.input, summary.errors);
        process::exit(1);
    }
}
