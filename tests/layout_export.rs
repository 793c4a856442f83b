mod common;

use thumbgrid_pdf::{Options, intake};

#[test]
fn generate_bytes_matches_layout_and_serializes() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<_> = (0..4)
        .map(|i| common::write_png(dir.path(), &format!("p{i}.png"), 200, 100))
        .collect();
    let loaded = intake::load_images(&paths);
    let sources: Vec<_> = loaded.images.iter().map(|img| img.source.clone()).collect();

    let (doc, bytes) = thumbgrid_pdf::generate_bytes(&loaded.images, &Options::default()).unwrap();
    assert_eq!(doc, thumbgrid_pdf::layout(&sources, &Options::default().config).unwrap());
    assert_eq!(common::page_count(&bytes), 1);

    let json = serde_json::to_value(&doc).unwrap();
    let placements = json["pages"][0]["placements"].as_array().unwrap();
    assert_eq!(placements.len(), 4);
    assert_eq!(placements[3]["row"], 1);
    assert_eq!(placements[3]["column"], 0);
    let w = placements[0]["rendered_width"].as_f64().unwrap();
    let h = placements[0]["rendered_height"].as_f64().unwrap();
    assert!((w / h - 2.0).abs() < 1e-3);
}

#[test]
fn rendering_an_empty_layout_is_refused() {
    let err = thumbgrid_pdf::generate_bytes(&[], &Options::default()).unwrap_err();
    assert!(matches!(err, thumbgrid_pdf::Error::EmptyDocument));
}
