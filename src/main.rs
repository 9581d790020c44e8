use std::env;
use std::path::Path;
use std::process;

use exifrw::Parser;

/// Program name, whether `--write` was given, and the file names
fn split_args<I: Iterator<Item = String>>(mut args: I) -> (String, bool, Vec<String>) {
    let program = args.next().unwrap_or_else(|| "exifrwtool".to_string());
    let (flags, files): (Vec<_>, Vec<_>) = args.partition(|a| a == "--write");
    (program, !flags.is_empty(), files)
}

/// Lists the EXIF tags of all files passed as CLI parameters, assuming that the files
/// contain JPEG images. With `--write`, each file is also written back next to the
/// original as `<name>.out.jpg`.
fn main() {
    env_logger::init();

    let (program, write, files) = split_args(env::args());
    if files.is_empty() {
        eprintln!("Usage: {} [--write] image1 image2 ...", program);
        process::exit(2);
    }

    let parser = Parser::new();
    for arg in &files {
        match parser.parse_file(arg) {
            Ok(data) => {
                match &data.exif {
                    Some(exif) => {
                        println!("{}: {:?} byte order", arg, exif.byte_align());
                        for (kind, ifd) in exif.directories() {
                            for entry in ifd.entries() {
                                let name = parser.tags().resolve(kind, entry.tag()).name;
                                match entry.value() {
                                    Ok(value) => println!(
                                        "\t{} {:#06x} {}: {}",
                                        kind,
                                        entry.tag(),
                                        name,
                                        value
                                    ),
                                    Err(e) => println!(
                                        "\t{} {:#06x} {}: <{}>",
                                        kind,
                                        entry.tag(),
                                        name,
                                        e
                                    ),
                                }
                            }
                        }
                        println!("\tthumbnail: {} bytes", exif.thumbnail().len());
                    }
                    None => println!("{}: no EXIF data", arg),
                }

                if write {
                    let out = Path::new(arg).with_extension("out.jpg");
                    match data.write_file(&out) {
                        Ok(()) => log::info!("Wrote {}", out.display()),
                        Err(e) => eprintln!("Error writing {}: {}", out.display(), e),
                    }
                }
            }
            Err(e) => {
                eprintln!("Error in {}: {}", &arg, e);
            }
        }
    }
}
