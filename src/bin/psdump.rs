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

use std::io::{stdin, stderr};
use std::io::{Read, BufReader};
use std::fs::File;
use clap::{Arg, App};
use pmrecovery::error::Error;
use pmrecovery::ident::{page_label, IdentifierTable};
use pmrecovery::io::Debug;
use pmrecovery::meta::{decode, Decoder, MetadataRecord};

fn main() {
	let matches = App::new("psdump")
		.version("1.0")
		.author("Steve Muller <steve.muller@outlook.com>")
		.about("This utility reads a PaperMaster metadata file (_PFC._PS) and lists the names it assigns. Each output line contains the identifier and its name, separated by a space.")
		.arg(Arg::with_name("verbose")
			.short("v")
			.help("Increases the debug verbosity. This will print a lot of debug messages to standard error (STDERR). Can be used up to 3 times.")
			.multiple(true)
			.takes_value(false))
		.arg(Arg::with_name("input")
			.short("i")
			.long("input")
			.value_name("FILE")
			.help("If specified, then the metadata file will be read from this file. Otherwise it will be read from standard input (STDIN).")
			.takes_value(true))
	.get_matches();

	let verbose = matches.occurrences_of("verbose") as i8;
	let inputfile = matches.value_of("input").unwrap_or("-");
	let table = matches.is_present("table");

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

	let result = if table {
		dump_table(BufReader::new(input), &mut debug)
	}
	else {
		process(BufReader::new(input), &mut debug)
	};
	if let Err(e) = result {
		if e.is_format_violation() {
			eprintln!("FORMAT ERROR: {}", e);
			std::process::exit(2);
		}
		eprintln!("ERROR: {}", e);
		std::process::exit(1);
	}
}

fn process(input: impl Read, debug: &mut Debug) -> Result<(), Error> {
	let mut decoder = Decoder::new(input, debug)?;
	while let Some(record) = decoder.next_record(debug)? {
		match record {
			MetadataRecord::Name { identifier, label } => println!("{} {}", identifier, label),
			MetadataRecord::Page { identifier, order, position } => {
				debug.logln(1, format!("{} has position counter {}", identifier, position));
				println!("{} {}", identifier, page_label(order));
			},
			MetadataRecord::Annotation => debug.logln(1, format!("Skipped an annotation record.")),
		}
	}
	Ok(())
}

fn dump_table(input: impl Read, debug: &mut Debug) -> Result<(), Error> {
	let mut table = IdentifierTable::new();
	for record in decode(input, debug)? {
		table.apply(&record);
	}
	let mut entries: Vec<_> = table.iter().collect();
	entries.sort();
	for (identifier, label) in entries {
		println!("{} {}", identifier, label);
	}
	Ok(())
}
