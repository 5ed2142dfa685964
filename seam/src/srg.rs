//! Reading of the SRG line format.
//!
//! One mapping per line:
//! ```txt,ignore
//! CL: <owner> <obfOwner>
//! FD: <owner>/<name> <obfOwner>/<obfName>
//! MD: <owner>/<name> <desc> <obfOwner>/<obfName> <obfDesc>
//! ```
//! Package lines (`PK:`) carry nothing the engine consumes and are skipped,
//! as are blank lines and `#` comments.

use std::io::{BufRead, BufReader, Read};
use anyhow::{anyhow, bail, Context, Result};
use chisel::tree::class::ClassName;
use chisel::tree::field::FieldName;
use chisel::tree::method::{MethodDescriptor, MethodName, MethodNameAndDesc};
use crate::tree::{MappedField, MappingTable};

/// Reads an SRG file into one namespace's [`MappingTable`].
pub fn read(reader: impl Read) -> Result<MappingTable> {
	let mut table = MappingTable::new();

	for (line_number, line) in BufReader::new(reader).lines().enumerate() {
		let line_number = line_number + 1;
		let line = line?;

		read_line(&mut table, &line)
			.with_context(|| anyhow!("in line {line_number}: {line:?}"))?;
	}

	Ok(table)
}

fn read_line(table: &mut MappingTable, line: &str) -> Result<()> {
	let line = line.trim();
	if line.is_empty() || line.starts_with('#') {
		return Ok(());
	}

	let mut fields = line.split_whitespace();
	let kind = fields.next().unwrap_or_default();
	let fields: Vec<&str> = fields.collect();

	match kind {
		"CL:" => {
			let [src, dst] = fields[..] else {
				bail!("expected 2 fields for a class mapping, got {}", fields.len());
			};
			table.add_class(ClassName::from(src.to_owned()), ClassName::from(dst.to_owned()))
		},
		"FD:" => {
			let [src, dst] = fields[..] else {
				bail!("expected 2 fields for a field mapping, got {}", fields.len());
			};
			let (src_owner, src_name) = split_member(src)?;
			let (dst_owner, dst_name) = split_member(dst)?;

			table.add_field(src_owner, FieldName::from(src_name.to_owned()), MappedField {
				class: dst_owner,
				name: FieldName::from(dst_name.to_owned()),
			})
		},
		"MD:" => {
			let [src, src_desc, dst, dst_desc] = fields[..] else {
				bail!("expected 4 fields for a method mapping, got {}", fields.len());
			};
			let (src_owner, src_name) = split_member(src)?;
			let (dst_owner, dst_name) = split_member(dst)?;

			let key = MethodNameAndDesc {
				name: MethodName::from(src_name.to_owned()),
				desc: MethodDescriptor::from(src_desc.to_owned()),
			};
			let dst = MethodNameAndDesc {
				name: MethodName::from(dst_name.to_owned()),
				desc: MethodDescriptor::from(dst_desc.to_owned()),
			};
			table.add_method(src_owner, key, dst.with_class(dst_owner))
		},
		"PK:" => Ok(()), // package mappings aren't consumed
		kind => bail!("unknown line kind {kind:?}"),
	}
}

/// Splits `a/b/c/name` into the owner `a/b/c` and the member name `name`.
fn split_member(spec: &str) -> Result<(ClassName, &str)> {
	match spec.rsplit_once('/') {
		Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
			Ok((ClassName::from(owner.to_owned()), name))
		},
		_ => bail!("member spec {spec:?} isn't of the form <owner>/<name>"),
	}
}
