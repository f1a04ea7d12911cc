//! Sensor node firmware: status LED, periodic report and a wakeup button,
//! all driven by the scheduler.
//!
//! Built for the host, the same tasks run against a simulated clock.

#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]

#[cfg(target_arch = "avr")]
mod firmware {
    use avr_device::atmega328p::Peripherals;
    use avr_device::interrupt::{self, Mutex};
    use core::cell::RefCell;
    use panic_halt as _;

    use node_scheduler::hal::avr::{Millis, Sleepy, StatusLed, Usart0};
    use node_scheduler::logger::{self, Console};
    use node_scheduler::os::{self, SCHEDULE};
    use node_scheduler::{log_error, log_info, Handle, Priority, ScheduleError, TaskBuilder};

    const BLINK_MS: u16 = 500;
    const REPORT_MS: u16 = 10_000;
    const BUTTON_POLL_MS: u16 = 30_000;
    const PD2: u8 = 1 << 2;

    static LED: Mutex<RefCell<Option<StatusLed>>> = Mutex::new(RefCell::new(None));

    fn blink() {
        interrupt::free(|cs| {
            if let Some(led) = LED.borrow(cs).borrow_mut().as_mut() {
                led.toggle();
            }
        });
    }

    fn report(handle: Handle) {
        log_info!(
            "report {}: up {}s, {} tasks",
            handle,
            Millis::now_u32() / 1000,
            SCHEDULE.pending()
        );
    }

    fn button() {
        log_info!("button at {}ms", SCHEDULE.now());
        os::rearm_wakeup_pin();
    }

    fn register() -> Result<(), ScheduleError> {
        TaskBuilder::new(blink).every(&SCHEDULE, BLINK_MS)?;
        TaskBuilder::with_handle(report)
            .priority(Priority::Background)
            .start_delay(1_000)
            .every(&SCHEDULE, REPORT_MS)?;
        TaskBuilder::new(button)
            .priority(Priority::Interrupt)
            .every(&SCHEDULE, BUTTON_POLL_MS)?;
        Ok(())
    }

    #[avr_device::entry]
    fn main() -> ! {
        let dp = Peripherals::take().unwrap();

        Millis::init(dp.TC0);
        logger::init(Console::new(Usart0::new(dp.USART0)));
        interrupt::free(|cs| {
            LED.borrow(cs).replace(Some(StatusLed::new()));
        });

        // Pull-up on the button line
        dp.PORTD
            .portd
            .modify(|r, w| unsafe { w.bits(r.bits() | PD2) });
        os::enable_wakeup_pin(&dp.EXINT);

        unsafe { interrupt::enable() };

        log_info!("node scheduler v{}", env!("CARGO_PKG_VERSION"));
        if let Err(e) = register() {
            log_error!("setup: {}", e);
        }

        let mut power = Sleepy::new();
        loop {
            SCHEDULE.dispatch_and_sleep(&mut power);
        }
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {
    simulation::run();
}

#[cfg(not(target_arch = "avr"))]
mod simulation {
    use node_scheduler::hal::sim::{SimClock, SimPower};
    use node_scheduler::{Handle, Priority, ScheduleError, Scheduler, SleepMode, TaskBuilder};

    const SESSION_MS: u16 = 6_000;
    const BUTTON_AT_MS: u32 = 1_234;

    type Schedule = Scheduler<SimClock, 8>;

    thread_local! {
        static SCHEDULE: Schedule = const { Scheduler::new(SimClock::new(0)) };
    }

    fn now() -> u16 {
        SCHEDULE.with(|sched| sched.now())
    }

    fn blink() {
        println!("{:>5} ms  led toggle", now());
    }

    fn report(handle: Handle) {
        let pending = SCHEDULE.with(|sched| sched.pending());
        println!("{:>5} ms  report {}: {} tasks", now(), handle, pending);
    }

    fn button() {
        println!("{:>5} ms  button", now());
    }

    fn register(sched: &Schedule) -> Result<(), ScheduleError> {
        TaskBuilder::new(blink).every(sched, 500)?;
        TaskBuilder::with_handle(report)
            .priority(Priority::Background)
            .start_delay(1_000)
            .every(sched, 2_000)?;
        TaskBuilder::new(button)
            .priority(Priority::Interrupt)
            .every(sched, 30_000)?;
        Ok(())
    }

    pub fn run() {
        SCHEDULE.with(session);
    }

    fn session(sched: &Schedule) {
        if let Err(e) = register(sched) {
            eprintln!("setup: {}", e);
            return;
        }

        let mut power = SimPower::new(sched.clock());
        power.interrupt_after(sched.interrupt_flag(), BUTTON_AT_MS);

        let half = SESSION_MS / 2;
        while sched.now() < half {
            sched.dispatch_and_sleep(&mut power);
        }
        println!("idle sleep: {} ticks", power.idle_ticks());

        sched.set_sleep_mode(SleepMode::PowerDown);
        while sched.now() < SESSION_MS {
            sched.dispatch_and_sleep(&mut power);
        }
        println!("power down: {} timed sleeps", power.timed_sleeps());
    }
}
