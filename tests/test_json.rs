use metadump::json::{Container, JsonWriter};

fn render(f: impl FnOnce(&mut JsonWriter<'_, Vec<u8>>)) -> String {
    let mut buf = Vec::new();
    {
        let mut json = JsonWriter::new(&mut buf);
        f(&mut json);
    }
    String::from_utf8(buf).unwrap()
}

#[test]
fn test_nested_document() {
    let out = render(|json| {
        json.object();
        json.field("name", "cam0");
        json.field("enabled", &true);
        json.object_field("size");
        json.field("w", &640);
        json.field("h", &480);
        json.end();
        json.array_field("ids");
        json.value(&1u32);
        json.value(&2u32);
        json.value(&3u32);
        json.end();
        json.end();
    });

    assert_eq!(
        out,
        "{\"name\":\"cam0\",\"enabled\":true,\"size\":{\"w\":640,\"h\":480},\"ids\":[1,2,3]}\n"
    );
}

#[test]
fn test_objects_inside_array_are_separated() {
    let out = render(|json| {
        json.array();
        json.object();
        json.field("a", &1);
        json.end();
        json.object();
        json.field("b", &2);
        json.end();
        json.array();
        json.end();
    });

    assert_eq!(out, "[{\"a\":1},{\"b\":2},[]]\n");
}

#[test]
fn test_empty_containers() {
    let out = render(|json| {
        json.object();
        json.object_field("empty");
        json.end();
        json.array_field("none");
    });

    assert_eq!(out, "{\"empty\":{},\"none\":[]}\n");
}

#[test]
fn test_with_root_and_finish() {
    let mut buf = Vec::new();
    let mut json = JsonWriter::with_root(&mut buf, Container::Array);
    assert_eq!(json.depth(), 1);
    json.value("x");
    json.value(&false);
    json.finish();

    assert_eq!(buf, b"[\"x\",false]\n");
}

#[test]
fn test_end_at_depth_zero_is_ignored() {
    let out = render(|json| {
        json.object();
        json.end();
        json.end();
    });

    assert_eq!(out, "{}\n");
}

#[test]
fn test_floats_and_signed_values() {
    let out = render(|json| {
        json.object();
        json.field("cpu", &12.5f64);
        json.field("whole", &3.0f64);
        json.field("delta", &-7i64);
    });

    assert_eq!(out, "{\"cpu\":12.5,\"whole\":3,\"delta\":-7}\n");
}

#[test]
fn test_only_quotes_are_escaped() {
    let out = render(|json| {
        json.object();
        json.field("q\"k", "tab\there \"quoted\" \\ ünïcode");
    });

    assert_eq!(out, "{\"q\\\"k\":\"tab\there \\\"quoted\\\" \\ ünïcode\"}\n");
}

#[test]
fn test_depth_tracks_open_containers() {
    let mut buf = Vec::new();
    let mut json = JsonWriter::new(&mut buf);
    assert_eq!(json.depth(), 0);
    json.object();
    json.array_field("a");
    json.object();
    assert_eq!(json.depth(), 3);
    json.end();
    assert_eq!(json.depth(), 2);
}
