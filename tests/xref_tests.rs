//! Cross-reference chain tests: incremental updates, hybrid files, and
//! compressed objects reached through xref streams.


use pdf_graph::{Document, PdfError, Value, XrefEntry};
use test_utils::{PdfBuilder, deflate};

/// Scenario: a main table whose `/Prev` points at an older table; an object
/// listed only in the older table resolves through the chain.
#[test]
fn test_chained_classic_tables() {
    let mut builder = PdfBuilder::new();
    let off1 = builder.add_object(1, b"<< /Type /Catalog >>");
    let off2 = builder.add_object(2, b"(only in the old table)");

    // older table covering objects 0..2
    let old_table = builder.add_raw(
        format!(
            "xref\n0 3\n0000000000 65535 f \n{:010} 00000 n \n{:010} 00000 n \n\
             trailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            off1,
            off2,
            builder.pos()
        )
        .as_bytes(),
    );

    // incremental update: a new object and a table that only lists it
    let mut data = builder.into_bytes();
    let off3 = data.len() as u64;
    data.extend_from_slice(b"3 0 obj\n(added later)\nendobj\n");
    let new_table = data.len() as u64;
    data.extend_from_slice(
        format!(
            "xref\n3 1\n{:010} 00000 n \n\
             trailer\n<< /Size 4 /Prev {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            off3, old_table, new_table
        )
        .as_bytes(),
    );

    let mut doc = Document::from_bytes(data).unwrap();
    assert_eq!(doc.start_offset(), new_table);

    // only the main section is parsed up front
    assert_eq!(doc.xref().sections().len(), 1);

    // resolving an old object extends the chain one hop
    let value = doc.get_object(2, 0).unwrap();
    assert_eq!(*value, Value::String(b"only in the old table".to_vec()));
    assert_eq!(doc.xref().sections().len(), 2);

    let value = doc.get_object(3, 0).unwrap();
    assert_eq!(*value, Value::String(b"added later".to_vec()));

    // the merged trailer keeps the newest value for /Size
    assert_eq!(doc.trailer().get_int(b"Size"), Some(4));
}

/// Scenario: a newer table shadows an object from an older one; the newest
/// definition wins.
#[test]
fn test_update_shadows_older_entry() {
    let mut builder = PdfBuilder::new();
    let off_old = builder.add_object(2, b"(old)");
    let old_table = builder.add_raw(
        format!(
            "xref\n0 1\n0000000000 65535 f \n2 1\n{:010} 00000 n \n\
             trailer\n<< /Size 3 >>\nstartxref\n{}\n%%EOF\n",
            off_old,
            builder.pos()
        )
        .as_bytes(),
    );

    let mut data = builder.into_bytes();
    let off_new = data.len() as u64;
    data.extend_from_slice(b"2 0 obj\n(new)\nendobj\n");
    let new_table = data.len() as u64;
    data.extend_from_slice(
        format!(
            "xref\n2 1\n{:010} 00000 n \ntrailer\n<< /Size 3 /Prev {} >>\nstartxref\n{}\n%%EOF\n",
            off_new, old_table, new_table
        )
        .as_bytes(),
    );

    let mut doc = Document::from_bytes(data).unwrap();
    assert_eq!(
        *doc.get_object(2, 0).unwrap(),
        Value::String(b"new".to_vec())
    );
}

/// Hybrid file: the classic trailer carries `/XRefStm`, which takes
/// precedence over `/Prev` when the chain extends.
#[test]
fn test_xref_stm_precedes_prev() {
    let mut builder = PdfBuilder::new();
    let off_prev_version = builder.add_object(2, b"(via Prev)");
    builder.add_object(1, b"<< /Type /Catalog >>");
    let mut data = builder.into_bytes();

    let off_stm_version = data.len() as u64;
    data.extend_from_slice(b"2 0 obj\n(via XRefStm)\nendobj\n");

    // xref stream: lists object 2 (stream version) and itself
    let stream_offset = data.len() as u64;
    assert!(off_stm_version < 0x10000 && stream_offset < 0x10000);
    let records: Vec<u8> = vec![
        0x01,
        (off_stm_version >> 8) as u8,
        (off_stm_version & 0xFF) as u8,
        0x00,
        0x01,
        (stream_offset >> 8) as u8,
        (stream_offset & 0xFF) as u8,
        0x00,
    ];
    data.extend_from_slice(
        format!(
            "4 0 obj\n<< /Type /XRef /Size 5 /Index [2 1 4 1] /W [1 2 1] /Length {} >>\nstream\n",
            records.len()
        )
        .as_bytes(),
    );
    data.extend_from_slice(&records);
    data.extend_from_slice(b"\nendstream\nendobj\n");

    // old classic table: lists the Prev version of object 2
    let old_table = data.len() as u64;
    data.extend_from_slice(
        format!(
            "xref\n0 1\n0000000000 65535 f \n2 1\n{:010} 00000 n \n\
             trailer\n<< /Size 3 >>\nstartxref\n{}\n%%EOF\n",
            off_prev_version, old_table
        )
        .as_bytes(),
    );

    // main classic table: no entries of its own, but /XRefStm and /Prev
    let main_table = data.len() as u64;
    data.extend_from_slice(
        format!(
            "xref\ntrailer\n<< /Size 5 /Root 1 0 R /XRefStm {} /Prev {} >>\nstartxref\n{}\n%%EOF\n",
            stream_offset, old_table, main_table
        )
        .as_bytes(),
    );

    let mut doc = Document::from_bytes(data).unwrap();
    let value = doc.get_object(2, 0).unwrap();
    assert_eq!(*value, Value::String(b"via XRefStm".to_vec()));
}

/// Compressed objects: an xref stream maps two objects into a FlateDecode
/// object stream; both children materialize from one decoded container.
#[test]
fn test_compressed_objects_via_xref_stream() {
    // the container body: pair header, then the two child values
    let children: [&[u8]; 2] = [b"<< /Kind /First /V 10 0 R >>", b"[1 2 3]"];
    let mut payload = Vec::new();
    let mut header = String::new();
    for (num, body) in [(10u32, children[0]), (11u32, children[1])] {
        header.push_str(&format!("{} {} ", num, payload.len()));
        payload.extend_from_slice(body);
    }
    let first = header.len();
    let mut container_body = header.into_bytes();
    container_body.extend_from_slice(&payload);
    let compressed = deflate(&container_body);

    let mut data = b"%PDF-2.0\n".to_vec();
    let container_offset = data.len() as u64;
    data.extend_from_slice(
        format!(
            "6 0 obj\n<< /Type /ObjStm /N 2 /First {} /Filter /FlateDecode /Length {} >>\nstream\n",
            first,
            compressed.len()
        )
        .as_bytes(),
    );
    data.extend_from_slice(&compressed);
    data.extend_from_slice(b"\nendstream\nendobj\n");

    let stream_offset = data.len() as u64;
    assert!(container_offset < 0x10000 && stream_offset < 0x10000);
    let records: Vec<u8> = vec![
        // object 5: the xref stream itself
        0x01,
        (stream_offset >> 8) as u8,
        (stream_offset & 0xFF) as u8,
        0x00,
        // object 6: the container
        0x01,
        (container_offset >> 8) as u8,
        (container_offset & 0xFF) as u8,
        0x00,
        // objects 10 and 11: compressed in container 6
        0x02, 0x00, 0x06, 0x00, //
        0x02, 0x00, 0x06, 0x01, //
    ];
    data.extend_from_slice(
        format!(
            "5 0 obj\n<< /Type /XRef /Size 12 /Index [5 2 10 2] /W [1 2 1] /Length {} >>\nstream\n",
            records.len()
        )
        .as_bytes(),
    );
    data.extend_from_slice(&records);
    data.extend_from_slice(b"\nendstream\nendobj\n");
    data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", stream_offset).as_bytes());

    let mut doc = Document::from_bytes(data).unwrap();

    assert_eq!(
        doc.xref().entry(10),
        Some(&XrefEntry::Compressed {
            container: 6,
            index: 0
        })
    );

    let value = doc.get_object(10, 0).unwrap();
    let dict = value.as_dict().unwrap();
    assert_eq!(
        dict.get_name(b"Kind").map(|n| n.as_bytes().to_vec()),
        Some(b"First".to_vec())
    );

    let value = doc.get_object(11, 0).unwrap();
    assert_eq!(
        *value,
        Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );

    // a compressed object with a non-zero generation does not exist
    assert!(matches!(
        doc.get_object(10, 1),
        Err(PdfError::MissingObject { .. })
    ));
}

/// An xref stream whose body is predictor-encoded the way real writers
/// emit it (FlateDecode + PNG Up rows).
#[test]
fn test_xref_stream_with_predictor() {
    let mut data = b"%PDF-2.0\n".to_vec();
    let obj_offset = data.len() as u64;
    data.extend_from_slice(b"1 0 obj\n(payload)\nendobj\n");

    let stream_offset = data.len() as u64;
    assert!(obj_offset < 256 && stream_offset < 256);

    // plain records, /W [1 1 1]: the free head, object 1, the stream itself
    let rows: [[u8; 3]; 3] = [
        [0x00, 0x00, 0xFF],
        [0x01, obj_offset as u8, 0x00],
        [0x01, stream_offset as u8, 0x00],
    ];
    // apply the Up predictor forward: emitted byte = raw - previous row
    let mut predicted = Vec::new();
    let mut previous = [0u8; 3];
    for row in rows {
        predicted.push(2u8);
        for (i, &byte) in row.iter().enumerate() {
            predicted.push(byte.wrapping_sub(previous[i]));
        }
        previous = row;
    }
    let compressed = deflate(&predicted);

    data.extend_from_slice(
        format!(
            "2 0 obj\n<< /Type /XRef /Size 3 /W [1 1 1] /Filter /FlateDecode \
             /DecodeParms << /Predictor 12 /Columns 3 >> /Length {} >>\nstream\n",
            compressed.len()
        )
        .as_bytes(),
    );
    data.extend_from_slice(&compressed);
    data.extend_from_slice(b"\nendstream\nendobj\n");
    data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", stream_offset).as_bytes());

    let mut doc = Document::from_bytes(data).unwrap();
    assert_eq!(
        doc.xref().entry(1),
        Some(&XrefEntry::InUse {
            offset: obj_offset,
            generation: 0
        })
    );
    assert_eq!(
        *doc.get_object(1, 0).unwrap(),
        Value::String(b"payload".to_vec())
    );
}

/// Two tables pointing at each other terminate cleanly.
#[test]
fn test_mutual_prev_loop_terminates() {
    let mut builder = PdfBuilder::new();
    builder.add_object(1, b"(present)");
    let mut data = builder.into_bytes();

    // /Prev values are zero-padded so both blocks have a fixed length and
    // table B's offset can be computed before table A is written
    let table_a = data.len() as u64;
    let block_len = format!(
        "xref\n0 1\n0000000000 65535 f \ntrailer\n<< /Size 2 /Prev {:010} >>\n",
        0
    )
    .len() as u64;
    let table_b = table_a + block_len;

    data.extend_from_slice(
        format!(
            "xref\n0 1\n0000000000 65535 f \ntrailer\n<< /Size 2 /Prev {:010} >>\n",
            table_b
        )
        .as_bytes(),
    );
    data.extend_from_slice(
        format!(
            "xref\n0 1\n0000000000 65535 f \ntrailer\n<< /Size 2 /Prev {:010} >>\nstartxref\n{}\n%%EOF\n",
            table_a, table_b
        )
        .as_bytes(),
    );

    let mut doc = Document::from_bytes(data).unwrap();

    // exhausting the chain visits both tables exactly once
    assert!(matches!(
        doc.get_object(7, 0),
        Err(PdfError::MissingObject { .. })
    ));
    assert_eq!(doc.xref().sections().len(), 2);
}
