// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of HashRank — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use hr_nn::{
    io, ImageFrame, TensorError, TripletBatch, TripletLoss, TripletRankingConfig,
    TripletRankingLoss, TripletRecord,
};
use tempfile::tempdir;

fn gradient_frame(height: usize, width: usize, offset: u8) -> ImageFrame {
    hr_nn::init_tracing();
    let pixels = (0..height * width * 3)
        .map(|i| offset.wrapping_add((i * 7) as u8))
        .collect();
    ImageFrame::new(height, width, 3, pixels).unwrap()
}

fn sample_records() -> Vec<TripletRecord> {
    (0..3u8)
        .map(|i| {
            TripletRecord::pack(
                &gradient_frame(4, 4, i),
                &gradient_frame(4, 4, i.wrapping_add(5)),
                &gradient_frame(4, 4, i.wrapping_add(90)),
            )
            .unwrap()
        })
        .collect()
}

#[test]
fn records_roundtrip_through_bincode_and_json() {
    let records = sample_records();
    let dir = tempdir().unwrap();

    let bin = dir.path().join("triplets.bin");
    io::save_records_bincode(&records, &bin).unwrap();
    assert_eq!(io::load_records_bincode(&bin).unwrap(), records);

    let json = dir.path().join("triplets.json");
    io::save_records_json(&records, &json).unwrap();
    assert_eq!(io::load_records_json(&json).unwrap(), records);
}

#[test]
fn corrupt_records_are_rejected_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.json");
    std::fs::write(
        &path,
        r#"[{ "channels": 9, "height": 1, "width": 1, "label": 1, "data": [1, 2] }]"#,
    )
    .unwrap();
    assert_eq!(
        io::load_records_json(&path).unwrap_err(),
        TensorError::DataLength {
            expected: 9,
            got: 2
        }
    );

    let missing = dir.path().join("missing.bin");
    assert!(matches!(
        io::load_records_bincode(&missing),
        Err(TensorError::IoError { .. })
    ));
}

#[test]
fn config_roundtrips_and_validates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("loss.json");
    let config = TripletRankingConfig::new(0.7, 10.0, 48).with_margin(2.0);
    io::save_config_json(&config, &path).unwrap();
    assert_eq!(io::load_config_json(&path).unwrap(), config);

    std::fs::write(&path, r#"{ "lamda": -1.0 }"#).unwrap();
    assert!(io::load_config_json(&path).unwrap_err().is_invalid_argument());
}

#[test]
fn packed_records_feed_the_loss() {
    let records = sample_records();
    let batch = TripletBatch::from_records(&records).unwrap();
    assert_eq!(batch.shape(), (3, 3 * 4 * 4));
    assert!(batch
        .original()
        .data()
        .iter()
        .all(|v| (0.0..=1.0).contains(v)));

    let kernel = TripletRankingLoss::new(TripletRankingConfig::new(0.7, 10.0, 48)).unwrap();
    let loss = kernel.forward(&batch, 1.0).unwrap();
    assert!(loss.is_finite() && loss > 0.0);

    assert_eq!(
        TripletBatch::from_records(&[]).unwrap_err(),
        TensorError::EmptyInput("triplet records")
    );
}
