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

use std::io::{stdin, stdout, stderr};
use std::io::{Read, Write, BufReader, BufWriter};
use std::io::Error;
use std::fs::File;
use clap::{Arg, App};
use pmrecovery::image::{extract, ImageKind};
use pmrecovery::io::Debug;

fn main() {
	let matches = App::new("pmextract")
		.version("1.0")
		.author("Steve Muller <steve.muller@outlook.com>")
		.about("This utility reads a PaperMaster page file and extracts the TIFF or JPEG image embedded in it.")
		.arg(Arg::with_name("verbose")
			.short("v")
			.help("Increases the debug verbosity. This will print a lot of debug messages to standard error (STDERR). Can be used up to 3 times.")
			.multiple(true)
			.takes_value(false))
		.arg(Arg::with_name("input")
			.short("i")
			.long("input")
			.value_name("FILE")
			.help("If specified, then the page file will be read from this file. Otherwise it will be read from standard input (STDIN).")
			.takes_value(true))
		.arg(Arg::with_name("output")
			.short("o")
			.long("output")
			.value_name("FILE")
			.help("If specified, then the image will be written to this file. Otherwise it will be written to standard output (STDOUT). The file is only created if an image is found.")
			.takes_value(true))
	.get_matches();

	let verbose = matches.occurrences_of("verbose") as i8;
	let inputfile = matches.value_of("input").unwrap_or("-");
	let outputfile = matches.value_of("output").unwrap_or("-");

	let mut debug = Debug::new(stderr(), verbose);
	let input: Box<dyn Read> = match inputfile {
		"" | "-" => Box::new(stdin()),
		_ => match File::open(inputfile) {
			Ok(file) => Box::new(file),
			Err(e) => {
				eprintln!("I/O ERROR: {}", e);
				std::process::exit(1);
			},
		},
	};

	match process(BufReader::new(input), outputfile, &mut debug) {
		Ok(true) => {},
		Ok(false) => {
			eprintln!("No TIFF or JPEG image found in the input.");
			std::process::exit(1);
		},
		Err(e) => {
			eprintln!("I/O ERROR: {}", e);
			std::process::exit(1);
		},
	}
}

fn process(input: impl Read, outputfile: &str, debug: &mut Debug) -> Result<bool, Error> {
	let open_output = |_: ImageKind| -> Result<Box<dyn Write>, Error> {
		match outputfile {
			"" | "-" => Ok(Box::new(stdout())),
			_ => Ok(Box::new(BufWriter::new(File::create(outputfile)?))),
		}
	};

	match extract(input, open_output, debug)? {
		Some((payload, _)) => {
			debug.logln(0, format!("Extracted {} image starting at offset {}.", payload.kind.extension(), payload.offset));
			Ok(true)
		},
		None => Ok(false),
	}
}
