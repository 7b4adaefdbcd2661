//! Plain-text and JSON rendering of layouts, write records and reports.

use std::fmt::Write as _;

use spillway_core::{
    AddressSpace, CorruptionReport, RegionHandle, SimulationOutcome, TypedRegionView, WriteOp,
};

use crate::load::CliError;

fn region_name(space: &AddressSpace, handle: RegionHandle) -> &str {
    space
        .region(handle)
        .map_or("?", |descriptor| descriptor.name.as_str())
}

/// Region map with each region's fields indented beneath it.
#[must_use]
pub fn render_layout(space: &AddressSpace, view: &TypedRegionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<16} {:>8} {:>8} {:>6}", "region", "base", "end", "size");
    for handle in space.handles() {
        let Ok(region) = space.region(handle) else {
            continue;
        };
        let _ = writeln!(
            out,
            "{:<16} {:>#8x} {:>#8x} {:>6}",
            region.name,
            region.base,
            region.end(),
            region.capacity
        );
        for (_, field) in view.fields_in(handle) {
            let _ = writeln!(
                out,
                "  +{:<4} {:<20} {}[{}]",
                field.offset,
                field.name,
                field.kind.label(),
                field.width
            );
        }
    }
    let _ = writeln!(out, "total {} bytes", space.end());
    out
}

/// Summary of one raw read: counts and the regions it reached.
#[must_use]
pub fn render_write(space: &AddressSpace, op: &WriteOp) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "read into `{}` at {:#x}: requested {}, wrote {}{}",
        region_name(space, op.destination()),
        op.base(),
        op.requested(),
        op.written(),
        if op.is_short() { " (short read)" } else { "" }
    );
    for span in op.spans() {
        let marker = if span.region == op.destination() {
            ""
        } else {
            "  <- spill"
        };
        let _ = writeln!(
            out,
            "  {:<16} +{:<4} {:>4} bytes{marker}",
            region_name(space, span.region),
            span.region_offset,
            span.len
        );
    }
    if op.spilled_bytes() > 0 {
        let _ = writeln!(
            out,
            "spilled {} bytes past capacity {}",
            op.spilled_bytes(),
            op.destination_capacity()
        );
    }
    out
}

/// One line per corrupted field, or a note that nothing changed.
#[must_use]
pub fn render_report(report: &CorruptionReport) -> String {
    if report.is_empty() {
        return String::from("no fields changed\n");
    }
    let mut out = format!("{} field(s) changed:\n", report.len());
    for change in report {
        let _ = writeln!(out, "  {change}");
    }
    out
}

/// Write record and report as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`CliError::Encode`] if serialization fails.
pub fn render_json(outcome: &SimulationOutcome) -> Result<String, CliError> {
    let value = serde_json::json!({
        "write": &outcome.write,
        "spilled_bytes": outcome.write.spilled_bytes(),
        "report": &outcome.report,
    });
    serde_json::to_string_pretty(&value).map_err(CliError::Encode)
}
