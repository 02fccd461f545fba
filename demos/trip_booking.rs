//! Trip Booking Workflow
//!
//! This example walks a rider through a multi-step booking flow driven by a
//! state engine, with a back-stack handling the back button.
//!
//! Key concepts:
//! - Guarded transitions (a ride can only be requested from vehicle selection)
//! - Asynchronous transitions (fare quote from a simulated service)
//! - Failed transitions keep the current state
//! - Back navigation collapses revisited steps and is blocked while searching
//!
//! Run with: cargo run --example trip_booking

use std::time::Duration;
use stepwise::builder::{goto, guarded_goto, BackStackBuilder, EngineBuilder};
use stepwise::core::State;
use stepwise::effects::{Transition, TransitionError};
use stepwise::navigation::BackOutcome;

#[derive(Clone, PartialEq, Debug)]
enum Booking {
    Pickup,
    Destination { pickup: String },
    Vehicle { fare_cents: u32 },
    Searching,
    Matched { driver: String },
}

impl State for Booking {
    fn name(&self) -> &str {
        match self {
            Self::Pickup => "Pickup",
            Self::Destination { .. } => "Destination",
            Self::Vehicle { .. } => "Vehicle",
            Self::Searching => "Searching",
            Self::Matched { .. } => "Matched",
        }
    }

    fn is_final(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

// Simulated fare service
async fn quote_fare(distance_km: u32) -> Result<u32, String> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    if distance_km == 0 {
        return Err("pickup and destination are the same".to_string());
    }
    Ok(250 + distance_km * 120)
}

fn fare_transition(distance_km: u32) -> Transition<Booking> {
    Transition::asynchronous(move |current: Booking| async move {
        if !matches!(current, Booking::Destination { .. }) {
            return Err(TransitionError::invalid(&current));
        }
        let fare_cents = quote_fare(distance_km)
            .await
            .map_err(TransitionError::operation)?;
        Ok(Booking::Vehicle { fare_cents })
    })
    .named("quote_fare")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Trip Booking Workflow ===\n");

    let engine = EngineBuilder::new()
        .label("booking")
        .initial(Booking::Pickup)
        .build()
        .expect("valid engine configuration");
    let back_stack = BackStackBuilder::new()
        .same_by(|s: &Booking| s.name().to_string())
        .back_disabled_when(|s| matches!(s, Booking::Searching))
        .build()
        .expect("valid back-stack configuration");

    let _following = back_stack.follow(&engine);
    let worker = engine.start().expect("inside a runtime");

    let mut states = engine.observe_current_state();
    let printer = tokio::spawn(async move {
        while let Some(state) = states.next_state().await {
            println!("  [State] {:?}", state);
            if state.is_final() {
                break;
            }
        }
    });

    engine.submit(goto(Booking::Destination {
        pickup: "Home".into(),
    }));
    // Same pickup and destination: the quote fails and the state stays put.
    engine.submit(fare_transition(0));
    engine.submit(fare_transition(12));
    // Searching is only reachable from vehicle selection.
    engine.submit(guarded_goto(Booking::Searching, |s: &Booking| {
        matches!(s, Booking::Vehicle { .. })
    }));

    tokio::time::sleep(Duration::from_millis(300)).await;
    match back_stack.back(|| println!("  [Back] leaving the workflow")) {
        BackOutcome::Disabled => println!("  [Back] blocked while searching"),
        other => println!("  [Back] {:?}", other),
    }

    engine.submit(goto(Booking::Matched {
        driver: "Sam".into(),
    }));

    let _ = printer.await;
    worker.stop().await;

    println!("\nHistory: {:?}", back_stack.history());
    let log = engine.recent_transitions();
    println!(
        "Transitions: {} applied, {} rejected or failed",
        log.applied_count(),
        log.failed_count()
    );
}
