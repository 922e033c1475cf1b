// Copyright 2022 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use {
    apple_bom_inspect::{
        block::BomBlock, parse_file, BomDocument, BomPath, BomPathType, Error, ParseOptions,
    },
    clap::{value_parser, Arg, ArgAction, Command},
    log::LevelFilter,
    std::{io::Write, path::PathBuf},
};

fn print_paths(paths: Option<&Vec<BomPath>>) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(&paths)?);

    Ok(())
}

fn print_paths_short(doc: &BomDocument) {
    for path in doc.paths.iter().flatten() {
        if path.path_type() == BomPathType::Symlink {
            println!(
                "{} {} -> {}",
                path.symbolic_mode(),
                path.path(),
                path.link_name()
            );
        } else {
            println!("{} {}", path.symbolic_mode(), path.path());
        }
    }
}

fn main_impl() -> Result<(), Error> {
    let matches = Command::new("Apple BOM Dumper")
        .arg_required_else_help(true)
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Show information about Apple BOM data structures")
        .arg(
            Arg::new("path")
                .action(ArgAction::Set)
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .num_args(1)
                .help("Path to BOM file"),
        )
        .arg(
            Arg::new("action")
                .action(ArgAction::Set)
                .value_parser([
                    "json",
                    "header",
                    "blocks-index",
                    "blocks",
                    "bom-info",
                    "vars-index",
                    "paths",
                    "paths-short",
                    "hl-index",
                    "size64",
                    "v-index",
                    "errors",
                ])
                .default_value("json")
                .help("Which content to show"),
        )
        .arg(
            Arg::new("no_blocks")
                .long("no-blocks")
                .action(ArgAction::SetTrue)
                .help("Don't decode individual blocks"),
        )
        .arg(
            Arg::new("raw_block_bytes")
                .long("raw-block-bytes")
                .action(ArgAction::SetTrue)
                .help("Include hex encoded data of each block"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase logging verbosity. Can be specified multiple times"),
        )
        .get_matches();

    let log_level = match matches.get_count("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();

    let path = matches
        .get_one::<PathBuf>("path")
        .ok_or_else(|| Error::CliBadArgs("path is required".into()))?;
    let action = matches
        .get_one::<String>("action")
        .ok_or_else(|| Error::CliBadArgs("action is required".into()))?;

    let options = ParseOptions::default()
        .include_blocks(action == "json" || action == "blocks")
        .include_raw_block_bytes(matches.get_flag("raw_block_bytes"));
    let options = if matches.get_flag("no_blocks") {
        options.include_blocks(false)
    } else {
        options
    };

    let doc = parse_file(path, &options)?;

    match action.as_str() {
        "json" => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &doc)?;
            writeln!(stdout)?;
        }
        "header" => {
            println!("{:#?}", doc.header);
        }
        "blocks-index" => {
            println!("{} total blocks", doc.blocks_index.count);
            for (i, entry) in doc.blocks_index.blocks.iter().enumerate() {
                println!("#{i}: {entry:?}");
            }
        }
        "blocks" => {
            for summary in doc.blocks.iter().flatten() {
                let i = summary.index;
                match (&summary.block, &summary.parse_error) {
                    (BomBlock::Unknown, Some(err)) => {
                        println!("#{i}: (unknown) {err}");
                    }
                    (block, _) => {
                        println!("#{i}: {block:?}");
                    }
                }
                if let Some(raw) = &summary.raw_hex {
                    println!("    {raw}");
                }
            }
        }
        "bom-info" => {
            println!("{:#?}", doc.bom_info);
        }
        "vars-index" => {
            for var in &doc.variables {
                println!("{}: block {}", var.name, var.block_index);
            }
        }
        "paths" => {
            print_paths(doc.paths.as_ref())?;
        }
        "paths-short" => {
            print_paths_short(&doc);
        }
        "hl-index" => {
            print_paths(doc.hl_index.as_ref())?;
        }
        "size64" => {
            print_paths(doc.size64.as_ref())?;
        }
        "v-index" => {
            print_paths(doc.vindex.as_ref())?;
        }
        "errors" => {
            for err in &doc.parse_errors {
                println!("{}: {}: {}", err.section, err.kind, err.detail);
            }
        }
        _ => {
            return Err(Error::CliBadArgs(format!("unhandled action: {action}")));
        }
    }

    Ok(())
}

fn main() {
    let exit_code = match main_impl() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    };

    std::process::exit(exit_code)
}
