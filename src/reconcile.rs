//! Read/write reconciliation passes over a device's lines.
//!
//! The read path pulls backend state into stored line state and decides
//! per line whether the result counts as an external change; the write
//! path pushes stored state out for lines flagged dirty. Both passes stop
//! at the first backend failure and leave the remaining flags set, so the
//! next forced or flagged pass retries exactly what is still pending.

use tracing::debug;

use crate::backend::{BackendError, MixerBackend};
use crate::device::Device;
use crate::line::{LineState, LineUpdate};

/// Pull backend state into every line where `force` is set or a read was
/// requested.
pub(crate) fn read_pass(
    backend: &mut dyn MixerBackend,
    dev: &mut Device,
    force: bool,
) -> Result<(), BackendError> {
    for index in 0..dev.lines.len() {
        let (wants_read, seeded, mask, has_enable) = {
            let line = &dev.lines[index];
            (
                force || line.read_required(),
                line.state.enabled,
                line.channels,
                line.has_enable,
            )
        };
        if !wants_read {
            continue;
        }

        // Candidate starts zeroed, seeded with the current enabled flag for
        // backends that cannot report mute state themselves.
        let mut candidate = LineState::muted();
        candidate.enabled = seeded;
        backend.line_read(dev, index, &mut candidate)?;
        candidate.normalize(mask);

        let line = &mut dev.lines[index];
        line.clear_read_required();

        let accepted = if has_enable {
            // Backend has real mute, any difference counts.
            candidate != line.state
        } else if line.state.enabled {
            // Unmuted, only volume diffs count.
            candidate.volumes != line.state.volumes
        } else {
            // Considered muted: all-zero volumes mean nothing happened,
            // anything else is an external unmute.
            if candidate.volumes_all_zero() {
                false
            } else {
                candidate.enabled = true;
                true
            }
        };
        if !accepted {
            continue;
        }

        debug!(line = line.display_name(), "accepted backend state change");
        line.state = candidate;
        line.set_updated(LineUpdate::Backend);
    }

    Ok(())
}

/// Push stored state to the backend for every line where `force` is set or
/// a write was requested. Read-only lines are never written.
pub(crate) fn write_pass(
    backend: &mut dyn MixerBackend,
    dev: &mut Device,
    force: bool,
) -> Result<(), BackendError> {
    for index in 0..dev.lines.len() {
        let out = {
            let line = &mut dev.lines[index];
            if !force && !line.write_required() {
                continue;
            }
            if line.is_read_only {
                continue;
            }
            if !line.has_enable && !line.state.enabled {
                // No independent mute on this line: write zeroes to
                // simulate the disable.
                LineState::muted()
            } else {
                line.state.normalize(line.channels);
                line.state
            }
        };
        backend.line_write(dev, index, &out)?;
        dev.lines[index].clear_write_required();
    }

    Ok(())
}
