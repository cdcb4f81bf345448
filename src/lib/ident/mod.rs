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

use std::collections::hash_map::{HashMap, Iter};
use super::meta::MetadataRecord;

/// Length of a cabinet identifier such as `000001F2`.
pub const IDENTIFIER_LEN: usize = 8;

/// Whether `candidate` is an 8-character uppercase hexadecimal identifier.
pub fn is_identifier(candidate: &str) -> bool {
	is_identifier_bytes(candidate.as_bytes())
}

pub fn is_identifier_bytes(candidate: &[u8]) -> bool {
	candidate.len() == IDENTIFIER_LEN && candidate.iter().all(|&b| match b {
		b'0'..=b'9' | b'A'..=b'F' => true,
		_ => false,
	})
}

/// Replaces every character that Windows does not accept in a file name with `_`.
/// The dot is replaced too, since runs of dots confuse the output tree.
pub fn sanitize(name: &str) -> String {
	name.chars()
		.map(|c| match c {
			'>' | '<' | ':' | '/' | '\\' | '|' | '?' | '"' | '*' | '.' => '_',
			_ => c,
		})
		.collect()
}

/// The label of a page. The cabinet counts pages from 0, labels count from 1.
pub fn page_label(order: u32) -> String {
	format!("Page{:05}", order as u64 + 1)
}

/// Maps identifiers to the human-readable labels found in the metadata files.
/// A later label for the same identifier replaces the earlier one.
#[derive(Clone, Debug, Default)]
pub struct IdentifierTable {
	labels: HashMap<String, String>,
}

impl IdentifierTable {
	pub fn new() -> IdentifierTable {
		IdentifierTable { labels: HashMap::new() }
	}

	pub fn insert(&mut self, identifier: String, label: String) -> Option<String> {
		self.labels.insert(identifier, label)
	}

	/// Records the label carried by a metadata record. Annotations carry none.
	pub fn apply(&mut self, record: &MetadataRecord) -> Option<String> {
		match record {
			MetadataRecord::Name { identifier, label } => self.insert(identifier.clone(), label.clone()),
			MetadataRecord::Page { identifier, order, .. } => self.insert(identifier.clone(), page_label(*order)),
			MetadataRecord::Annotation => None,
		}
	}

	pub fn get(&self, identifier: &str) -> Option<&str> {
		self.labels.get(identifier).map(String::as_str)
	}

	pub fn label_or<'a>(&'a self, identifier: &str, default: &'a str) -> &'a str {
		self.get(identifier).unwrap_or(default)
	}

	pub fn len(&self) -> usize {
		self.labels.len()
	}

	pub fn is_empty(&self) -> bool {
		self.labels.is_empty()
	}

	pub fn iter(&self) -> Iter<String, String> {
		self.labels.iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identifiers_are_uppercase_hex() {
		assert!(is_identifier("000001F2"));
		assert!(is_identifier("ABCDEF09"));
		assert!(!is_identifier("000001f2"));
		assert!(!is_identifier("000001G2"));
		assert!(!is_identifier("0000 1F2"));
		assert!(!is_identifier("000001F"));
		assert!(!is_identifier("000001F23"));
	}

	#[test]
	fn every_hex_digit_is_accepted() {
		for digit in "0123456789ABCDEF".chars() {
			let candidate: String = std::iter::repeat(digit).take(IDENTIFIER_LEN).collect();
			assert!(is_identifier(&candidate), "{}", candidate);
		}
	}

	#[test]
	fn sanitize_replaces_forbidden_characters() {
		assert_eq!(sanitize("A:B*C.D"), "A_B_C_D");
		assert_eq!(sanitize(r#"<a>|b\c/d?"e""#), "_a__b_c_d__e_");
		assert_eq!(sanitize("Personal Documents"), "Personal Documents");
	}

	#[test]
	fn sanitize_is_idempotent() {
		for name in &["A:B*C.D", "..", "Taxes 2014", "x/y\\z", ""] {
			let once = sanitize(name);
			assert_eq!(sanitize(&once), once);
		}
	}

	#[test]
	fn page_labels_count_from_one() {
		assert_eq!(page_label(0), "Page00001");
		assert_eq!(page_label(41), "Page00042");
		assert_eq!(page_label(99998), "Page99999");
	}

	#[test]
	fn later_label_replaces_earlier() {
		let mut table = IdentifierTable::new();
		assert_eq!(table.insert("00000002".to_owned(), "Taxes".to_owned()), None);
		assert_eq!(table.insert("00000002".to_owned(), "Bills".to_owned()), Some("Taxes".to_owned()));
		assert_eq!(table.get("00000002"), Some("Bills"));
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn missing_identifier_falls_back_to_default() {
		let table = IdentifierTable::new();
		assert!(table.is_empty());
		assert_eq!(table.label_or("00000009", "Default"), "Default");
	}

	#[test]
	fn apply_maps_pages_and_ignores_annotations() {
		let mut table = IdentifierTable::new();
		table.apply(&MetadataRecord::Page { identifier: "00000003".to_owned(), order: 41, position: 0 });
		table.apply(&MetadataRecord::Annotation);
		assert_eq!(table.get("00000003"), Some("Page00042"));
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn iter_yields_each_mapping_once() {
		let mut table = IdentifierTable::new();
		table.insert("00000004".to_owned(), "Receipt".to_owned());
		table.insert("00000002".to_owned(), "Taxes".to_owned());
		table.insert("00000004".to_owned(), "Invoice".to_owned());
		let mut entries: Vec<_> = table.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
		entries.sort();
		assert_eq!(entries, vec![("00000002", "Taxes"), ("00000004", "Invoice")]);
	}
}
