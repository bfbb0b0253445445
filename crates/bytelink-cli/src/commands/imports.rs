//! `bytelink imports` - list the native import table.

use bytelink_runtime::types::MethodKind;
use bytelink_runtime::ImportTable;

pub fn execute(owner: Option<&str>) -> anyhow::Result<()> {
    let table = ImportTable::standard();
    let owners = match owner {
        Some(owner) if table.owners().contains(&owner) => vec![owner],
        Some(owner) => anyhow::bail!("No natives registered for {}", owner),
        None => table.owners(),
    };

    for owner in owners {
        println!("{}", owner);
        for (key, kind) in table.keys(owner) {
            let kind = match kind {
                MethodKind::Static => "static",
                MethodKind::Instance => "instance",
            };
            println!("  {:<8} {}", kind, key);
        }
    }
    Ok(())
}
