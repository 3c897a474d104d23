use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;
use shelter_community::models::DeviceState;
use shelter_community::services::transfer_code;
use std::hint::black_box;

fn benchmark_transfer_codes(c: &mut Criterion) {
    // A device near the upper end of what users keep around
    let state = json!({
        "deviceId": "bench-device",
        "settings": {"language": "ja", "pushEnabled": true},
        "savedAreas": (0..5).map(|i| json!({
            "id": format!("area-{}", i),
            "label": format!("避難先候補 {}", i),
            "lat": 35.0 + i as f64 * 0.1,
            "lon": 139.0 + i as f64 * 0.1,
        })).collect::<Vec<_>>(),
        "favorites": {"shelterIds": (0..5).map(|i| format!("shelter-{}", i)).collect::<Vec<_>>()},
        "recent": {"shelterIds": (0..50).map(|i| format!("shelter-{}", i)).collect::<Vec<_>>()},
        "checkinHistory": (0..200).map(|_| json!({
            "status": "SAFE",
            "at": "2026-01-01T00:00:00.000Z",
        })).collect::<Vec<_>>(),
    });
    let code = transfer_code::encode(&state);

    let mut group = c.benchmark_group("transfer_code");

    group.bench_function("encode", |b| {
        b.iter(|| transfer_code::encode(black_box(&state)))
    });

    group.bench_function("decode_verify", |b| {
        b.iter(|| transfer_code::decode(black_box(&code)))
    });

    group.bench_function("decode_into_device_state", |b| {
        b.iter(|| {
            let value = transfer_code::decode(black_box(&code)).expect("valid code");
            serde_json::from_value::<DeviceState>(value).expect("device state")
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_transfer_codes);
criterion_main!(benches);
