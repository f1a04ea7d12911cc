//! End-to-end scheduling scenarios against the simulated clock

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use node_scheduler::hal::sim::{SimClock, SimPower};
use node_scheduler::rtos::time::is_due;
use node_scheduler::{Callback, Handle, Priority, ScheduleError, Scheduler, TaskBuilder, IDLE};

fn noop() {}

fn scheduler<const N: usize>() -> Scheduler<SimClock, N> {
    Scheduler::new(SimClock::new(0))
}

/// Dispatch once per millisecond from the current tick up to `until`
fn run_until<const N: usize>(sched: &Scheduler<SimClock, N>, until: u16) {
    while sched.now() < until {
        sched.dispatch();
        sched.clock().advance(1);
    }
    sched.dispatch();
}

// Schedulers whose callbacks read the clock live per thread
thread_local! {
    static ONE_SHOT_CLOCK: Scheduler<SimClock, 2> = const { Scheduler::new(SimClock::new(0)) };
    static PERIODIC_CLOCK: Scheduler<SimClock, 2> = const { Scheduler::new(SimClock::new(0)) };
}

static ONE_SHOT_AT: AtomicU32 = AtomicU32::new(u32::MAX);

fn record_one_shot() {
    let now = ONE_SHOT_CLOCK.with(|sched| sched.now());
    ONE_SHOT_AT.store(now as u32, Ordering::SeqCst);
}

#[test]
fn one_shot_fires_once_delay_has_elapsed() {
    ONE_SHOT_CLOCK.with(one_shot_scenario);
}

fn one_shot_scenario(sched: &Scheduler<SimClock, 2>) {
    let handle = sched
        .after(25, Callback::Plain(record_one_shot), Priority::Normal)
        .unwrap();

    run_until(sched, 24);
    assert_eq!(ONE_SHOT_AT.load(Ordering::SeqCst), u32::MAX);
    assert!(sched.is_active(handle));

    sched.clock().advance(1);
    sched.dispatch();
    assert_eq!(ONE_SHOT_AT.load(Ordering::SeqCst), 25);
    assert!(!sched.is_active(handle));
    assert_eq!(sched.find_free_handle(), Some(handle));
}

static PERIODIC_AT: Mutex<Vec<u16>> = Mutex::new(Vec::new());

fn record_periodic() {
    let now = PERIODIC_CLOCK.with(|sched| sched.now());
    PERIODIC_AT.lock().unwrap().push(now);
}

#[test]
fn periodic_entry_keeps_its_spacing() {
    PERIODIC_CLOCK.with(periodic_scenario);
}

fn periodic_scenario(sched: &Scheduler<SimClock, 2>) {
    let handle = sched
        .every(100, Callback::Plain(record_periodic), Priority::Normal, None)
        .unwrap();

    run_until(sched, 350);
    assert_eq!(*PERIODIC_AT.lock().unwrap(), vec![100, 200, 300]);

    // Extra passes while nothing is due change nothing
    let before = sched.entry(handle).unwrap().next;
    for _ in 0..10 {
        assert_eq!(sched.dispatch(), 50);
    }
    assert_eq!(sched.entry(handle).unwrap().next, before);
}

static CLASS_ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

fn normal_task() {
    CLASS_ORDER.lock().unwrap().push("normal");
}

fn background_task() {
    CLASS_ORDER.lock().unwrap().push("background");
}

#[test]
fn normal_runs_before_background() {
    let sched = scheduler::<4>();
    sched
        .after(3, Callback::Plain(background_task), Priority::Background)
        .unwrap();
    sched
        .after(3, Callback::Plain(normal_task), Priority::Normal)
        .unwrap();
    sched.clock().set(5);

    assert_eq!(sched.dispatch(), 0);
    assert_eq!(*CLASS_ORDER.lock().unwrap(), vec!["normal"]);
    assert_eq!(sched.pending(), 1);

    assert_eq!(sched.dispatch(), IDLE);
    assert_eq!(*CLASS_ORDER.lock().unwrap(), vec!["normal", "background"]);
}

#[test]
fn full_table_leaves_entries_untouched() {
    let sched = scheduler::<4>();
    let handles: Vec<Handle> = (0..4)
        .map(|i| {
            sched
                .every(10 + i, Callback::Plain(noop), Priority::Normal, None)
                .unwrap()
        })
        .collect();
    let before: Vec<_> = handles
        .iter()
        .map(|&h| sched.entry(h).map(|e| (e.period, e.next, e.kind)))
        .collect();

    assert_eq!(
        sched.run(Callback::Plain(noop), Priority::Interrupt),
        Err(ScheduleError::TableFull)
    );
    let after: Vec<_> = handles
        .iter()
        .map(|&h| sched.entry(h).map(|e| (e.period, e.next, e.kind)))
        .collect();
    assert_eq!(before, after);
    assert_eq!(sched.pending(), 4);
}

#[test]
fn update_after_remove_does_nothing() {
    let sched = scheduler::<2>();
    let handle = sched
        .every(40, Callback::Plain(noop), Priority::High, None)
        .unwrap();
    sched.remove(handle);

    assert_eq!(
        sched.update(handle, 10, Some(0)),
        Err(ScheduleError::StaleHandle)
    );
    assert_eq!(sched.pending(), 0);
    assert_eq!(sched.dispatch(), IDLE);
}

static WOKEN: AtomicU32 = AtomicU32::new(0);

fn on_wakeup() {
    WOKEN.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn interrupt_forces_interrupt_entries_on_next_pass() {
    let sched = scheduler::<4>();
    let handle = TaskBuilder::new(on_wakeup)
        .priority(Priority::Interrupt)
        .every(&sched, 50_000)
        .unwrap();
    sched.clock().set(10);
    sched.dispatch();
    assert_eq!(WOKEN.load(Ordering::SeqCst), 0);

    sched.interrupt();
    sched.dispatch();
    assert_eq!(WOKEN.load(Ordering::SeqCst), 1);

    // Re-armed one period after the forced run
    let entry = sched.entry(handle).unwrap();
    assert_eq!(entry.next, 10 + 50_000 - 1);
    assert!(!sched.interrupt_flag().is_raised());
}

#[test]
fn update_to_zero_delay_keeps_identity() {
    let sched = scheduler::<4>();
    sched.clock().set(1_000);
    let handle = sched
        .every(500, Callback::Plain(noop), Priority::Background, None)
        .unwrap();

    assert_eq!(sched.update(handle, 250, Some(0)), Ok(handle));
    let entry = sched.entry(handle).unwrap();
    assert_eq!(entry.priority(), Some(Priority::Background));
    assert_eq!(entry.period, 250);
    assert!(is_due(sched.now(), entry.next));
}

static MIXED: Mutex<Vec<char>> = Mutex::new(Vec::new());

fn task_a() {
    MIXED.lock().unwrap().push('A');
}

fn task_b() {
    MIXED.lock().unwrap().push('B');
}

fn task_c() {
    MIXED.lock().unwrap().push('C');
}

#[test]
fn mixed_classes_share_a_pass() {
    let sched = scheduler::<4>();
    sched.after(10, Callback::Plain(task_a), Priority::Normal).unwrap();
    sched.after(5, Callback::Plain(task_b), Priority::High).unwrap();
    sched
        .after(1, Callback::Plain(task_c), Priority::Background)
        .unwrap();

    sched.clock().set(5);
    assert_eq!(sched.dispatch(), 5);
    let mut ran = MIXED.lock().unwrap().clone();
    ran.sort_unstable();
    assert_eq!(ran, vec!['B', 'C']);

    sched.clock().set(10);
    assert_eq!(sched.dispatch(), IDLE);
    assert_eq!(MIXED.lock().unwrap().last(), Some(&'A'));
    assert_eq!(sched.pending(), 0);
}

static SESSION_TICKS: AtomicU32 = AtomicU32::new(0);

fn session_tick() {
    SESSION_TICKS.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn main_loop_sleeps_between_firings() {
    let sched = scheduler::<4>();
    sched
        .every(100, Callback::Plain(session_tick), Priority::Normal, None)
        .unwrap();
    let mut power = SimPower::new(sched.clock());

    while sched.now() <= 1_000 {
        sched.dispatch_and_sleep(&mut power);
    }
    assert_eq!(SESSION_TICKS.load(Ordering::SeqCst), 10);
    // Firing takes no simulated time, every tick is spent asleep
    assert_eq!(power.idle_ticks(), 1_100);
    assert_eq!(sched.now(), 1_100);
}
