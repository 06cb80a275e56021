use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use takfeed_cot::{
    serialize_event, to_bytes, Contact, Event, Group, Point, Remarks, RemoteId, RemoteIdLocation,
    Track, UserIcon,
};

fn incident_event() -> Event {
    Event::builder("GeoSafety-25-001234", "a-u-G")
        .point(Point::new(42.3314, -83.0458, 0.0))
        .stale_after(Duration::hours(1))
        .detail(UserIcon::new(
            "6d781afb-89a6-4c07-b2b9-a89748b6a38f/Misc/Camp.png",
        ))
        .detail(Contact::new("MED | ACTIVE | 1 Main St"))
        .detail(Remarks::new(
            concat!(
                "Medical Emergency at 1 Main St\n\n",
                "STATUS: ACTIVE\n",
                "DISPATCHED: 12/17/2025 3:17:34 PM\n",
                "ARRIVAL: NO ARRIVAL\n\n",
                "12/17/2025 3:18:00 PM: Caller reports <fall> & injury\n\n",
            ),
        ))
        .detail(Group::new("Orange"))
        .build(Utc.with_ymd_and_hms(2025, 12, 17, 15, 17, 34).unwrap())
}

fn drone_event() -> Event {
    let now = Utc.with_ymd_and_hms(2025, 12, 17, 15, 17, 34).unwrap();
    Event::builder("UAS-6D781AFB89A6", "a-f-A-M-F-Q")
        .point(Point::with_accuracy(42.6064, -83.1480, 120.0, 10.0, 10.0).with_precision(7))
        .stale_after(Duration::seconds(6))
        .detail(Contact::new("DRONE-REMOTEID"))
        .detail(Track {
            course: 90.0,
            speed: 15.0,
        })
        .detail(RemoteId {
            standard: "simulated".to_string(),
            uas_id: "UAS-6D781AFB89A6".to_string(),
            msg_type: "basic_id+location".to_string(),
            location: RemoteIdLocation {
                lat: 42.6064,
                lon: -83.1480,
                alt_hae_m: 120.0,
                speed_mps: 15.0,
                heading_deg: 90.0,
            },
            timestamp: now,
        })
        .build(now)
}

fn bench_serialize(c: &mut Criterion) {
    let incident = incident_event();
    let drone = drone_event();

    let mut group = c.benchmark_group("serialize");
    group.bench_function("incident", |b| {
        b.iter(|| serialize_event(black_box(&incident)))
    });
    group.bench_function("drone", |b| b.iter(|| to_bytes(black_box(&drone))));
    group.finish();
}

criterion_group!(benches, bench_serialize);
criterion_main!(benches);
