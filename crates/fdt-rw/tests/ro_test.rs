//! Read-only surface: path and parent resolution, searches, and header
//! rejection, against a writer-built tree.

#![cfg(test)]

use fdt_rw::{Fdt, FdtError, SequentialWriter};

/// `/subnode1` and `/subnode2`, each carrying a `subsubnode`.
fn build_two_level_tree(buf: &mut [u8]) -> &mut Fdt {
    let mut writer = SequentialWriter::create(buf).unwrap();
    writer.finish_reservemap().unwrap();
    writer.begin_node("").unwrap();
    for name in ["subnode1", "subnode2"] {
        writer.begin_node(name).unwrap();
        writer.property_u32("prop-int", 1).unwrap();
        writer.begin_node("subsubnode").unwrap();
        writer.property("placeholder", b"this is a placeholder string\0").unwrap();
        writer.end_node().unwrap();
        writer.end_node().unwrap();
    }
    writer.end_node().unwrap();
    writer.finish().unwrap()
}

fn parent_path(path: &str) -> &str {
    let cut = path.rfind('/').unwrap();
    if cut == 0 { "/" } else { &path[..cut] }
}

#[test]
fn parent_offset_agrees_with_parent_path() {
    let mut buf = [0_u8; 4096];
    let fdt = build_two_level_tree(&mut buf);
    for path in [
        "/subnode1",
        "/subnode2",
        "/subnode1/subsubnode",
        "/subnode2/subsubnode",
    ] {
        let node = fdt.path_offset(path).unwrap();
        let by_path = fdt.path_offset(parent_path(path)).unwrap();
        let by_walk = fdt.parent_offset(node).unwrap();
        assert_eq!(by_walk, by_path, "path: {path}");
    }
    assert_eq!(fdt.parent_offset(0).unwrap_err(), FdtError::NotFound);
}

#[test]
fn depth_matches_path_components() {
    let mut buf = [0_u8; 4096];
    let fdt = build_two_level_tree(&mut buf);
    assert_eq!(fdt.node_depth(0).unwrap(), 0);
    let sub = fdt.path_offset("/subnode1").unwrap();
    assert_eq!(fdt.node_depth(sub).unwrap(), 1);
    let subsub = fdt.path_offset("/subnode1/subsubnode").unwrap();
    assert_eq!(fdt.node_depth(subsub).unwrap(), 2);
    assert_eq!(fdt.supernode_at_depth(subsub, 1).unwrap(), sub);
}

#[test]
fn node_path_inverts_path_offset() {
    let mut storage = [0_u8; 4096];
    let fdt = build_two_level_tree(&mut storage);
    let mut buf = [0_u8; 64];
    for path in ["/", "/subnode2", "/subnode2/subsubnode"] {
        let node = fdt.path_offset(path).unwrap();
        assert_eq!(fdt.node_path(node, &mut buf).unwrap(), path);
    }
}

#[test]
fn search_by_property_value_visits_stream_order() {
    let mut buf = [0_u8; 4096];
    let fdt = build_two_level_tree(&mut buf);
    let first = fdt
        .node_offset_by_prop_value(None, "prop-int", &1_u32.to_be_bytes())
        .unwrap();
    assert_eq!(first, fdt.path_offset("/subnode1").unwrap());
    let second = fdt
        .node_offset_by_prop_value(Some(first), "prop-int", &1_u32.to_be_bytes())
        .unwrap();
    assert_eq!(second, fdt.path_offset("/subnode2").unwrap());
    assert_eq!(
        fdt.node_offset_by_prop_value(Some(second), "prop-int", &1_u32.to_be_bytes())
            .unwrap_err(),
        FdtError::NotFound
    );
}

#[test]
fn corrupted_magic_stops_every_read() {
    let mut buf = [0_u8; 4096];
    let total = {
        let fdt = build_two_level_tree(&mut buf);
        fdt.total_size()
    };
    buf[0] ^= 0x01;
    assert_eq!(Fdt::from_bytes(&buf[..total]).unwrap_err(), FdtError::BadMagic);
    // No read-only operation is reachable without a valid header.
    assert!(Fdt::from_bytes(&buf[..total]).is_err());
}

#[test]
fn unit_address_lookup_rules() {
    let mut buf = [0_u8; 4096];
    let mut writer = SequentialWriter::create(&mut buf).unwrap();
    writer.finish_reservemap().unwrap();
    writer.begin_node("").unwrap();
    writer.begin_node("uart@fe001000").unwrap();
    writer.property_u32("reg", 0xfe00_1000).unwrap();
    writer.end_node().unwrap();
    writer.begin_node("uart@fe002000").unwrap();
    writer.property_u32("reg", 0xfe00_2000).unwrap();
    writer.end_node().unwrap();
    writer.end_node().unwrap();
    let fdt = writer.finish().unwrap();

    let first = fdt.path_offset("/uart@fe001000").unwrap();
    let second = fdt.path_offset("/uart@fe002000").unwrap();
    assert_ne!(first, second);
    // A bare name resolves to the first unit in stream order.
    assert_eq!(fdt.path_offset("/uart").unwrap(), first);
    assert_eq!(
        fdt.path_offset("/uart@missing").unwrap_err(),
        FdtError::NotFound
    );
}
