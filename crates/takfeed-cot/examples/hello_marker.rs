use chrono::{Duration, Utc};
use takfeed_cot::{serialize_event, validate_event, Contact, Event, Point};

fn main() {
    // Central Park, NY
    let event = Event::builder("name_your_marker", "a-h-A-M-A")
        .point(Point::with_accuracy(40.781789, -73.968698, 0.0, 10.0, 10.0))
        .stale_after(Duration::hours(1))
        .detail(Contact::new("HELLO-WORLD"))
        .build(Utc::now());

    match validate_event(&event) {
        Ok(()) => println!("Event is valid"),
        Err(e) => println!("Event failed validation: {}", e),
    }

    println!("  UID: {}", event.uid);
    println!("  Type: {}", event.event_type);
    println!("  Stale window: {}s", event.stale_window().num_seconds());
    println!();
    println!("{}", serialize_event(&event));
}
