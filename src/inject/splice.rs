//! Splicing a fragment into a target method body.

use anyhow::{bail, Result};
use chisel::tree::code::Code;
use crate::inject::Fragment;

/// Splices the fragment's instructions into `target` before index `at`.
///
/// The fragment is deep-copied with fresh labels, its local variable indices
/// at or above `locals_base` are shifted onto locals newly reserved past the
/// target's current frame, and the target's `max_stack`/`max_locals` are
/// raised conservatively. Later recomputation by a classfile writer may
/// tighten them; they are never too small after this.
pub fn splice(target: &mut Code, at: usize, fragment: &Fragment) -> Result<()> {
	if at > target.instructions.len() {
		bail!("splice index {at} is out of bounds, the method has {} instructions", target.instructions.len());
	}

	let base = target.max_locals.unwrap_or(0);

	let mut copied = target.clone_range(&fragment.instructions)?;
	for entry in &mut copied {
		if let Some(lv) = entry.instruction.local_index_mut() {
			// locals below the base are shared with the target frame
			// (the receiver and arguments), the rest move to fresh slots
			if lv.index >= fragment.locals_base {
				lv.index = lv.index - fragment.locals_base + base;
			}
		}
	}

	target.insert(at, copied);
	target.raise_max_stack(fragment.max_stack);
	target.ensure_max_locals(base.saturating_add(fragment.locals_used));

	Ok(())
}
