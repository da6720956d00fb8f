//! Smallest possible caller: enter a few delayed prints and drain them.
use std::{
    thread,
    time::{Duration, Instant},
};

use alarum::scheduling::Scheduler;

fn main() {
    env_logger::init();

    // synchronous dispatch keeps the printout in schedule order
    let sched = Scheduler::with_hooks(false, Instant::now, thread::sleep);
    for count in [3u64, 2, 1] {
        sched.enter(Duration::from_secs(4 - count), move || {
            println!("{count}...");
        });
    }
    sched.enter(Duration::from_secs(4), || println!("liftoff"));

    sched.run();
}
