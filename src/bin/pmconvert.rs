/*
pmrecovery library & toolset
Copyright (C) 2018 Steve Muller <steve.muller@outlook.com>

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/

extern crate clap;
extern crate pmrecovery;

use std::io::{stdin, stdout, stderr, Write};
use std::fs::create_dir_all;
use std::path::Path;
use clap::{Arg, App};
use pmrecovery::cabinet::{convert, is_cabinet, Options, Summary, DEFAULT_LABEL};
use pmrecovery::error::Error;
use pmrecovery::io::Debug;

fn main() {
	let matches = App::new("pmconvert")
		.version("1.0")
		.author("Steve Muller <steve.muller@outlook.com>")
		.about("This utility converts a PaperMaster document cabinet into a normal directory tree, with human-readable names and plain TIFF/JPEG pages.")
		.arg(Arg::with_name("verbose")
			.short("v")
			.help("Increases the debug verbosity. This will print a lot of debug messages to standard error (STDERR). Can be used up to 3 times.")
			.multiple(true)
			.takes_value(false))
		.arg(Arg::with_name("yes")
			.short("y")
			.long("yes")
			.help("Do not ask for confirmation before writing into the target directory.")
			.takes_value(false))
		.arg(Arg::with_name("default-name")
			.long("default-name")
			.value_name("NAME")
			.help("The name used for directories and pages whose name cannot be found in any _PFC._PS file.")
			.default_value(DEFAULT_LABEL))
		.arg(Arg::with_name("log")
			.long("log")
			.value_name("FILENAME")
			.help("The name of the conversion log, which is created in the target directory.")
			.default_value("log.txt"))
		.arg(Arg::with_name("source")
			.value_name("SOURCEDIR")
			.help("The cabinet directory. It must contain a _PFC._PS file; usually this is the 'Default' directory of the cabinet, or any directory below it to convert a partial tree.")
			.required(true))
		.arg(Arg::with_name("target")
			.value_name("TARGETDIR")
			.help("The directory where the converted tree is written to. Existing files with the same names are overwritten.")
			.required(true))
	.get_matches();

	let verbose = matches.occurrences_of("verbose") as i8;
	let source = Path::new(matches.value_of("source").unwrap_or(""));
	let target = Path::new(matches.value_of("target").unwrap_or(""));
	let log_name = matches.value_of("log").unwrap_or("log.txt");
	let options = Options { default_label: matches.value_of("default-name").unwrap_or(DEFAULT_LABEL).to_owned() };

	if !is_cabinet(source) {
		eprintln!("Start directory does not contain a _PFC._PS file. Aborting.");
		std::process::exit(1);
	}
	if !matches.is_present("yes") && !confirm(source, target) {
		println!("Aborting.");
		return;
	}

	let debug = Debug::new(stderr(), verbose);
	match process(source, target, log_name, options, debug) {
		Ok(summary) => {
			println!();
			for line in summary_lines(&summary) {
				println!("{}", line);
			}
			println!();
			println!("All done. Inspect {} in {} for details.", log_name, target.display());
		},
		Err(e) => {
			if e.is_format_violation() {
				eprintln!("FORMAT ERROR: {}", e);
				eprintln!("The metadata of this cabinet does not have the expected layout. The conversion has been stopped.");
				std::process::exit(2);
			}
			eprintln!("I/O ERROR: {}", e);
			std::process::exit(1);
		},
	}
}

fn confirm(source: &Path, target: &Path) -> bool {
	println!("Converting from <{}> to <{}> WHICH WILL BE OVERWRITTEN", source.display(), target.display());
	println!("Type OK to proceed, or Q to exit");
	stdout().flush().ok();

	let mut answer = String::new();
	match stdin().read_line(&mut answer) {
		Ok(_) => answer.trim().eq_ignore_ascii_case("OK"),
		Err(_) => false,
	}
}

fn process(source: &Path, target: &Path, log_name: &str, options: Options, debug: Debug) -> Result<Summary, Error> {
	create_dir_all(target)?;
	let mut debug = debug.with_journal(&target.join(log_name))?;

	let result = convert(source, target, options, &mut debug);
	match &result {
		Ok(summary) => {
			debug.journal(String::new());
			for line in summary_lines(summary) {
				debug.journal(line);
			}
		},
		Err(e) => debug.journal(format!("Conversion stopped: {}", e)),
	}
	debug.flush();
	result
}

fn summary_lines(summary: &Summary) -> Vec<String> {
	vec![
		format!("Images converted           = {}", summary.images),
		format!("Pages without TIFF or JPEG = {}", summary.unrecognised),
		format!("Native files copied        = {}", summary.native),
		format!("HTM embedded images copied = {}", summary.embedded),
		format!("OCR text files copied      = {}", summary.ocr),
		format!("Files with errors          = {}", summary.errors),
	]
}
