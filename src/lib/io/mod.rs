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

use std::fs::File;
use std::io::{BufWriter, Error, Stderr, Write};
use std::path::Path;
use chrono::Local;

const BANNER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Console debug output with a verbosity level, plus an optional run log (journal)
/// that records every mapping and every produced file of a conversion.
pub struct Debug {
	output: Stderr,
	level: i8,
	journal: Option<BufWriter<File>>,
}

impl Debug {
	pub fn new(output: Stderr, level: i8) -> Debug {
		Debug { output, level, journal: None }
	}

	/// Creates (or truncates) the run log at `path` and writes its banner.
	pub fn with_journal(mut self, path: &Path) -> Result<Debug, Error> {
		let mut journal = BufWriter::new(File::create(path)?);
		let started = Local::now().format(BANNER_TIME_FORMAT);
		writeln!(journal, "------------- CONVERSION FROM PAPERMASTER CABINET LOG ---------------")?;
		writeln!(journal)?;
		writeln!(journal, "Started at {}", started)?;
		writeln!(journal)?;
		self.journal = Some(journal);
		Ok(self)
	}

	pub fn log(&mut self, level: i8, string: String) {
		if self.level >= level {
			self.output.write_all(string.as_bytes()).ok();
		}
	}

	pub fn logln(&mut self, level: i8, string: String) {
		if self.level >= level {
			self.output.write_all(string.as_bytes()).ok();
			self.output.write_all(&[0x0A]).ok();
		}
	}

	/// Appends a line to the run log only. Does nothing when no run log is open.
	pub fn journal(&mut self, string: String) {
		if let Some(journal) = self.journal.as_mut() {
			writeln!(journal, "{}", string).ok();
		}
	}

	/// Warnings always reach the console and the run log, whatever the verbosity.
	pub fn warn(&mut self, string: String) {
		let line = format!("Warning : {}", string);
		self.output.write_all(line.as_bytes()).ok();
		self.output.write_all(&[0x0A]).ok();
		self.journal(line);
	}

	pub fn flush(&mut self) {
		if let Some(journal) = self.journal.as_mut() {
			journal.flush().ok();
		}
	}
}

impl Drop for Debug {
	fn drop(&mut self) {
		self.flush();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{NaiveDateTime, Timelike};
	use std::fs::read_to_string;
	use std::io::stderr;

	#[test]
	fn journal_collects_lines_and_warnings() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("log.txt");
		{
			let mut debug = Debug::new(stderr(), -1).with_journal(&path).unwrap();
			debug.journal(format!("000001F2 is Taxes"));
			debug.warn(format!("00000003 has no image"));
			debug.logln(3, format!("never shown"));
		}
		let content = read_to_string(&path).unwrap();
		assert!(content.starts_with("------------- CONVERSION FROM PAPERMASTER CABINET LOG"));
		assert!(content.contains("000001F2 is Taxes\n"));
		assert!(content.contains("Warning : 00000003 has no image\n"));
		assert!(!content.contains("never shown"));
	}

	#[test]
	fn journal_banner_carries_local_start_time() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("log.txt");
		let before = Local::now().naive_local();
		Debug::new(stderr(), -1).with_journal(&path).unwrap();
		let content = read_to_string(&path).unwrap();
		let line = content.lines().find(|l| l.starts_with("Started at ")).unwrap();
		assert!(!line.contains("epoch"));
		let started = NaiveDateTime::parse_from_str(&line["Started at ".len()..], BANNER_TIME_FORMAT).unwrap();
		assert!(started >= before.with_nanosecond(0).unwrap());
	}
}
