//! Cross-validates two independent counting paths over one catalog.

use catsweep_error::Result;

use crate::passes::PassCtx;
use crate::report::Reporter;

/// Compare the catalog's cheap cardinality query against a full enumeration.
///
/// The two can legitimately diverge (language filters, embargoed entries, an
/// enumeration that silently returns nothing). A divergence is one flagged
/// problem and a warning that the full-enumeration passes after this one may
/// be incomplete; it never triggers repair by itself.
pub fn check(ctx: &PassCtx<'_>, reporter: &mut Reporter) -> Result<u64> {
    let name = ctx.catalog_name;
    let size = ctx.catalog.record_count()?;
    reporter.line(format!("Records in {name}: {size}."));

    let enumerated = ctx.catalog.all_records()?.len();
    if enumerated == size {
        return Ok(0);
    }
    reporter.warn_line(format!(
        "Records in {name} from full enumeration is different: {enumerated}."
    ));
    Ok(1)
}
