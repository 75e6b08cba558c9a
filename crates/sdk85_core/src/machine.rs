/*
    SDK-85 Emulator
    A peripheral-level emulator of the SDK-85 8085 trainer

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    ---------------------------------------------------------------------------

    machine.rs

    The machine owns the peripheral controllers and the CPU, and runs the
    execution driver: a background thread that steps the CPU one
    instruction at a time, feeds elapsed cycles to the timer, delivers the
    timer's NMI, services reset requests and reports the effective clock
    rate.

    Anything that mutates shared board state (reset, loading an image,
    switching the console mode) first cancels the driver and joins it, which
    hands the CPU back to the machine. Nothing else synchronizes the driver
    with the frontend.

*/

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
        Mutex,
        MutexGuard,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use web_time::Instant;

use crate::{
    bus::BusInterface,
    channel::{event_channel, EventPublisher, EventReceiver},
    cpu_common::Cpu,
    devices::{
        kdc::{Kdc, KDC_DEFAULT_BASE},
        timer_io::{TimerIo, SERIAL_LINE_BIT},
    },
    machine_types::{BoardMode, MachineConfig, MachineEvent, MachineState},
    memerror::MemoryError,
};

#[derive(thiserror::Error, Debug)]
pub enum MachineError {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error("Failed to start the execution driver: {0}")]
    DriverSpawn(#[from] std::io::Error),
    #[error("The execution driver panicked; the CPU was lost")]
    DriverPanicked,
    #[error("No CPU is available to run")]
    CpuUnavailable,
}

/// Cooperative cancellation flag shared between the machine and its driver
/// thread. The driver checks it once per instruction.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Clock rate in Hz for `cycles` executed over `elapsed` wall time.
/// Undefined (None) if no time has passed.
pub fn clock_rate(cycles: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return None;
    }
    let hz = cycles as f64 / secs;
    hz.is_finite().then_some(hz)
}

struct ClockMeter {
    start: Instant,
    cycles: u64,
    interval: u64,
    next_report: u64,
}

impl ClockMeter {
    fn new(interval: u64) -> Self {
        Self {
            start: Instant::now(),
            cycles: 0,
            interval,
            next_report: interval,
        }
    }

    /// Account for `cycles` and return a fresh estimate each time the total
    /// crosses a multiple of the report interval. An interval of 0 never reports.
    fn add(&mut self, cycles: u32) -> Option<f64> {
        self.cycles += cycles as u64;
        if self.interval == 0 || self.cycles < self.next_report {
            return None;
        }
        self.next_report = (self.cycles / self.interval + 1) * self.interval;
        clock_rate(self.cycles, self.start.elapsed())
    }
}

/// Shared handles to the board's two controllers.
#[derive(Clone)]
pub struct MachineDevices {
    pub kdc: Arc<Kdc>,
    pub timer_io: Arc<TimerIo>,
}

/// Everything the driver loop needs besides the CPU.
#[derive(Clone)]
pub struct DriverContext {
    pub devices: MachineDevices,
    pub events: EventPublisher<MachineEvent>,
    pub clock_report_cycles: u64,
    pub halt_banner_delay: Duration,
}

/// Run `cpu` until it halts or `token` is cancelled. Returns the exit state.
pub fn run_driver(cpu: &mut dyn Cpu, ctx: &DriverContext, token: &CancelToken) -> MachineState {
    let timer_io = &ctx.devices.timer_io;
    let mut meter = ClockMeter::new(ctx.clock_report_cycles);

    loop {
        let cycles = cpu.step();

        if timer_io.tick(cycles) {
            timer_io.raise_nmi();
        }

        // Take both so neither request lingers into the next instruction.
        let cpu_reset = cpu.take_reset_request();
        let tic_reset = timer_io.take_reset();
        if cpu_reset || tic_reset {
            log::debug!("Driver: reset requested");
            cpu.reset();
        }

        if let Some(hz) = meter.add(cycles) {
            log::trace!("Driver: clock rate {:.0} Hz", hz);
            ctx.events.publish(MachineEvent::ClockRate(hz));
        }

        if cpu.is_halted() {
            log::debug!("Driver: CPU halted after {} cycles", meter.cycles);
            return MachineState::Halted;
        }
        if token.is_cancelled() {
            log::debug!("Driver: cancelled after {} cycles", meter.cycles);
            return MachineState::Cancelled;
        }
    }
}

/// Let the monitor's last display write settle, then put up the idle banner.
fn show_halt_banner(ctx: &DriverContext) {
    thread::sleep(ctx.halt_banner_delay);
    ctx.devices.kdc.show_banner();
    ctx.events.publish(MachineEvent::Halted);
}

struct Driver {
    token: CancelToken,
    handle: JoinHandle<(Box<dyn Cpu>, MachineState)>,
}

pub struct Machine {
    config: MachineConfig,
    devices: MachineDevices,
    cpu: Option<Box<dyn Cpu>>,
    driver: Option<Driver>,
    state: Arc<Mutex<MachineState>>,
    publisher: EventPublisher<MachineEvent>,
    receiver: EventReceiver<MachineEvent>,
}

impl Machine {
    /// Build the board around a CPU. `cpu_builder` receives the bus with the
    /// ROM already in place. The driver is not started.
    pub fn new<F>(config: MachineConfig, rom: &[u8], cpu_builder: F) -> Result<Machine, MachineError>
    where
        F: FnOnce(BusInterface) -> Box<dyn Cpu>,
    {
        let (publisher, receiver) = event_channel();
        let devices = MachineDevices {
            kdc: Arc::new(Kdc::new(KDC_DEFAULT_BASE, publisher.clone())),
            timer_io: Arc::new(TimerIo::new(publisher.clone())),
        };

        let mut bus = BusInterface::new(
            config.first_ram_address,
            devices.kdc.clone(),
            devices.timer_io.clone(),
        );
        bus.load_rom(rom)?;

        let machine = Machine {
            config,
            devices,
            cpu: Some(cpu_builder(bus)),
            driver: None,
            state: Arc::new(Mutex::new(MachineState::Stopped)),
            publisher,
            receiver,
        };
        machine.apply_board_mode();
        log::debug!("Machine created: {:?}", machine.config);
        Ok(machine)
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn devices(&self) -> &MachineDevices {
        &self.devices
    }

    pub fn events(&self) -> &EventReceiver<MachineEvent> {
        &self.receiver
    }

    pub fn state(&self) -> MachineState {
        *lock_state(&self.state)
    }

    /// True while a driver thread is stepping the CPU.
    pub fn is_running(&self) -> bool {
        self.driver.as_ref().is_some_and(|d| !d.handle.is_finished())
    }

    /// The CPU, if the driver is not holding it.
    pub fn cpu(&self) -> Option<&dyn Cpu> {
        self.cpu.as_deref()
    }

    pub fn cpu_mut(&mut self) -> Option<&mut (dyn Cpu + 'static)> {
        self.cpu.as_deref_mut()
    }

    /// Start a driver thread against the current CPU and memory. Does nothing
    /// if one is already running.
    pub fn resume(&mut self) -> Result<(), MachineError> {
        if self.is_running() {
            return Ok(());
        }
        // A driver that exited on its own still holds the CPU.
        self.join_driver()?;

        let mut cpu = self.cpu.take().ok_or(MachineError::CpuUnavailable)?;
        let token = CancelToken::new();
        let ctx = DriverContext {
            devices: self.devices.clone(),
            events: self.publisher.clone(),
            clock_report_cycles: self.config.clock_report_cycles,
            halt_banner_delay: self.config.halt_banner_delay(),
        };

        *lock_state(&self.state) = MachineState::Running;
        let thread_token = token.clone();
        let thread_state = self.state.clone();
        let spawned = thread::Builder::new().name("sdk85-driver".to_string()).spawn(move || {
            let exit = run_driver(cpu.as_mut(), &ctx, &thread_token);
            *lock_state(&thread_state) = exit;
            if exit == MachineState::Halted {
                show_halt_banner(&ctx);
            }
            (cpu, exit)
        });

        match spawned {
            Ok(handle) => {
                self.driver = Some(Driver { token, handle });
                log::debug!("Machine: driver started");
                Ok(())
            }
            Err(e) => {
                log::error!("Machine: failed to spawn driver: {}", e);
                *lock_state(&self.state) = MachineState::Stopped;
                Err(e.into())
            }
        }
    }

    /// Request cancellation and wait for the driver to stop. The CPU is
    /// back in the machine's hands when this returns.
    pub fn cancel(&mut self) -> Result<(), MachineError> {
        if let Some(driver) = &self.driver {
            driver.token.cancel();
        }
        self.join_driver()
    }

    fn join_driver(&mut self) -> Result<(), MachineError> {
        let Some(driver) = self.driver.take()
        else {
            return Ok(());
        };

        match driver.handle.join() {
            Ok((cpu, exit)) => {
                self.cpu = Some(cpu);
                *lock_state(&self.state) = exit;
                Ok(())
            }
            Err(_) => {
                log::error!("Machine: driver thread panicked");
                *lock_state(&self.state) = MachineState::Stopped;
                Err(MachineError::DriverPanicked)
            }
        }
    }

    /// Reboot the board: CPU, both controllers and the console line, then
    /// restart the driver.
    pub fn reset(&mut self) -> Result<(), MachineError> {
        self.cancel()?;
        let cpu = self.cpu.as_mut().ok_or(MachineError::CpuUnavailable)?;
        cpu.reset();
        self.devices.timer_io.reset();
        self.devices.kdc.reset();
        self.apply_board_mode();
        log::debug!("Machine: reset ({:?} mode)", self.config.mode);
        self.resume()
    }

    /// Copy a program into RAM and reboot. A rejected image leaves memory
    /// untouched and the driver as it was.
    pub fn load_image(&mut self, image: &[u8], address: u16) -> Result<(), MachineError> {
        let was_running = self.is_running();
        self.cancel()?;

        let cpu = self.cpu.as_mut().ok_or(MachineError::CpuUnavailable)?;
        if let Err(e) = cpu.bus_mut().load_image(image, address) {
            if was_running {
                self.resume()?;
            }
            return Err(e.into());
        }
        self.reset()
    }

    /// Switch between keypad and teletype console. The monitor only samples
    /// the line at reset, so this reboots.
    pub fn set_board_mode(&mut self, mode: BoardMode) -> Result<(), MachineError> {
        self.config.mode = mode;
        self.reset()
    }

    /// The monitor picks its console by sampling SID after reset: a high
    /// line means a terminal is attached.
    fn apply_board_mode(&self) {
        let timer_io = &self.devices.timer_io;
        match self.config.mode {
            BoardMode::Tty => {
                timer_io.set_serial_input(SERIAL_LINE_BIT);
                timer_io.set_tty_connected(true);
            }
            BoardMode::Keypad => {
                timer_io.set_serial_input(0x00);
                timer_io.set_tty_connected(false);
            }
        }
    }
}

impl Drop for Machine {
    fn drop(&mut self) {
        if let Err(e) = self.cancel() {
            log::warn!("Machine: {}", e);
        }
    }
}

fn lock_state(state: &Mutex<MachineState>) -> MutexGuard<'_, MachineState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bus::IoDevice,
        devices::{
            kdc::DisplayLatches,
            timer_io::{TIC_COMMAND_PORT, TIC_TIMER_LOW_PORT},
        },
    };
    use std::sync::atomic::AtomicU64;

    #[derive(Default)]
    struct Counters {
        steps: AtomicU64,
        nmis: AtomicU64,
        resets: AtomicU64,
    }

    /// Steps a fixed number of cycles per instruction and halts after a set
    /// number of instructions since the last reset.
    struct ScriptedCpu {
        bus: BusInterface,
        cycles: u32,
        halt_after: Option<u64>,
        since_reset: u64,
        request_reset_at: Option<u64>,
        step_delay: Option<Duration>,
        counters: Arc<Counters>,
    }

    impl ScriptedCpu {
        fn new(bus: BusInterface, counters: Arc<Counters>) -> Self {
            Self {
                bus,
                cycles: 4,
                halt_after: None,
                since_reset: 0,
                request_reset_at: None,
                step_delay: None,
                counters,
            }
        }
    }

    impl Cpu for ScriptedCpu {
        fn step(&mut self) -> u32 {
            if self.bus.take_nmi() {
                self.counters.nmis.fetch_add(1, Ordering::SeqCst);
            }
            if let Some(delay) = self.step_delay {
                thread::sleep(delay);
            }
            self.since_reset += 1;
            self.counters.steps.fetch_add(1, Ordering::SeqCst);
            self.cycles
        }

        fn reset(&mut self) {
            self.since_reset = 0;
            self.counters.resets.fetch_add(1, Ordering::SeqCst);
        }

        fn is_halted(&self) -> bool {
            self.halt_after.is_some_and(|n| self.since_reset >= n)
        }

        fn take_reset_request(&mut self) -> bool {
            if self.request_reset_at == Some(self.counters.steps.load(Ordering::SeqCst)) {
                self.request_reset_at = None;
                return true;
            }
            false
        }

        fn bus(&self) -> &BusInterface {
            &self.bus
        }

        fn bus_mut(&mut self) -> &mut BusInterface {
            &mut self.bus
        }
    }

    fn context(publisher: EventPublisher<MachineEvent>, report: u64) -> (DriverContext, BusInterface) {
        let devices = MachineDevices {
            kdc: Arc::new(Kdc::new(KDC_DEFAULT_BASE, publisher.clone())),
            timer_io: Arc::new(TimerIo::new(publisher.clone())),
        };
        let bus = BusInterface::new(0x1000, devices.kdc.clone(), devices.timer_io.clone());
        let ctx = DriverContext {
            devices,
            events: publisher,
            clock_report_cycles: report,
            halt_banner_delay: Duration::ZERO,
        };
        (ctx, bus)
    }

    fn scripted_machine(config: MachineConfig, halt_after: Option<u64>) -> (Machine, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let c = counters.clone();
        let machine = Machine::new(config, &[0x00; 0x100], move |bus| {
            let mut cpu = ScriptedCpu::new(bus, c);
            cpu.halt_after = halt_after;
            Box::new(cpu) as Box<dyn Cpu>
        })
        .unwrap();
        (machine, counters)
    }

    #[test]
    fn clock_rate_undefined_without_time() {
        assert_eq!(clock_rate(1000, Duration::ZERO), None);
        assert_eq!(clock_rate(0, Duration::ZERO), None);
        assert_eq!(clock_rate(3_000_000, Duration::from_secs(1)), Some(3_000_000.0));
        assert_eq!(clock_rate(0, Duration::from_millis(5)), Some(0.0));

        let tiny = clock_rate(u64::MAX, Duration::from_nanos(1)).unwrap();
        assert!(tiny.is_finite() && tiny >= 0.0);
    }

    #[test]
    fn driver_exits_on_halt() {
        let (publisher, _rx) = event_channel();
        let (ctx, bus) = context(publisher, 0);
        let counters = Arc::new(Counters::default());
        let mut cpu = ScriptedCpu::new(bus, counters.clone());
        cpu.halt_after = Some(5);

        let exit = run_driver(&mut cpu, &ctx, &CancelToken::new());
        assert_eq!(exit, MachineState::Halted);
        assert_eq!(counters.steps.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn driver_checks_cancellation_each_instruction() {
        let (publisher, _rx) = event_channel();
        let (ctx, bus) = context(publisher, 0);
        let counters = Arc::new(Counters::default());
        let mut cpu = ScriptedCpu::new(bus, counters.clone());

        let token = CancelToken::new();
        token.cancel();
        assert_eq!(run_driver(&mut cpu, &ctx, &token), MachineState::Cancelled);
        assert_eq!(counters.steps.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn elapsed_timer_raises_nmi() {
        let (publisher, _rx) = event_channel();
        let (ctx, bus) = context(publisher, 0);
        ctx.devices.timer_io.write_u8(TIC_TIMER_LOW_PORT, 10);
        ctx.devices.timer_io.write_u8(TIC_COMMAND_PORT, 0xC0);
        let counters = Arc::new(Counters::default());
        let mut cpu = ScriptedCpu::new(bus, counters.clone());
        cpu.halt_after = Some(10);

        run_driver(&mut cpu, &ctx, &CancelToken::new());
        // Period 10 at 4 cycles per step elapses on steps 3, 6 and 9; the CPU
        // sees each NMI on the following step.
        assert_eq!(counters.nmis.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn reset_requests_reset_cpu() {
        let (publisher, _rx) = event_channel();
        let (ctx, bus) = context(publisher, 0);
        let counters = Arc::new(Counters::default());
        let mut cpu = ScriptedCpu::new(bus, counters.clone());
        cpu.halt_after = Some(3);
        cpu.request_reset_at = Some(2);
        ctx.devices.timer_io.request_reset();

        run_driver(&mut cpu, &ctx, &CancelToken::new());
        // Latch reset after step 1, CPU request after step 2, then three more steps.
        assert_eq!(counters.resets.load(Ordering::SeqCst), 2);
        assert_eq!(counters.steps.load(Ordering::SeqCst), 5);
        assert!(!ctx.devices.timer_io.take_reset());
    }

    #[test]
    fn clock_rate_published_per_interval() {
        let (publisher, rx) = event_channel();
        let (ctx, bus) = context(publisher, 10);
        let counters = Arc::new(Counters::default());
        let mut cpu = ScriptedCpu::new(bus, counters);
        cpu.halt_after = Some(10);
        cpu.step_delay = Some(Duration::from_millis(1));

        run_driver(&mut cpu, &ctx, &CancelToken::new());
        let rates: Vec<f64> = rx
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                MachineEvent::ClockRate(hz) => Some(hz),
                _ => None,
            })
            .collect();
        // 40 cycles cross 10, 20, 30 and 40.
        assert_eq!(rates.len(), 4);
        assert!(rates.iter().all(|hz| hz.is_finite() && *hz >= 0.0));
    }

    #[test]
    fn machine_shows_banner_on_halt() {
        let config = MachineConfig {
            halt_banner_delay_ms: 1,
            ..Default::default()
        };
        let (mut machine, _counters) = scripted_machine(config, Some(100));
        assert_eq!(machine.state(), MachineState::Stopped);
        assert_eq!(machine.devices().kdc.latches(), DisplayLatches::power_on());

        machine.resume().unwrap();
        let halted = std::iter::from_fn(|| machine.events().recv_timeout(Duration::from_secs(5)))
            .any(|e| e == MachineEvent::Halted);
        assert!(halted);
        assert_eq!(machine.devices().kdc.latches(), DisplayLatches::idle_banner());

        machine.cancel().unwrap();
        assert_eq!(machine.state(), MachineState::Halted);
        assert!(machine.cpu().unwrap().is_halted());
    }

    #[test]
    fn cancel_returns_cpu_and_resume_restarts() {
        let (mut machine, counters) = scripted_machine(MachineConfig::default(), None);
        assert!(machine.cpu().is_some());

        machine.resume().unwrap();
        assert!(machine.is_running());
        assert!(machine.cpu().is_none());
        while counters.steps.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        machine.cancel().unwrap();
        assert_eq!(machine.state(), MachineState::Cancelled);
        assert!(machine.cpu().is_some());

        let before = counters.steps.load(Ordering::SeqCst);
        machine.resume().unwrap();
        while counters.steps.load(Ordering::SeqCst) == before {
            thread::yield_now();
        }
        machine.cancel().unwrap();
        // Cancelling a stopped machine is harmless.
        machine.cancel().unwrap();
        assert_eq!(machine.state(), MachineState::Cancelled);
    }

    #[test]
    fn oversized_rom_fails_before_start() {
        let result = Machine::new(MachineConfig::default(), &vec![0; 0x1001], |bus| {
            Box::new(ScriptedCpu::new(bus, Arc::new(Counters::default()))) as Box<dyn Cpu>
        });
        assert!(matches!(result, Err(MachineError::Memory(MemoryError::RomTooLarge { .. }))));
    }

    #[test]
    fn rom_under_controller_window_fails_before_start() {
        let config = MachineConfig {
            first_ram_address: 0x2000,
            ..Default::default()
        };
        let result = Machine::new(config, &vec![0; 0x1A00], |bus| {
            Box::new(ScriptedCpu::new(bus, Arc::new(Counters::default()))) as Box<dyn Cpu>
        });
        assert!(matches!(
            result,
            Err(MachineError::Memory(MemoryError::OverlapsReserved { base: 0x1800, .. }))
        ));
    }

    #[test]
    fn reset_selects_console_line() {
        let config = MachineConfig {
            mode: BoardMode::Tty,
            ..Default::default()
        };
        let (mut machine, counters) = scripted_machine(config, None);
        let timer_io = machine.devices().timer_io.clone();
        assert_eq!(timer_io.serial_input(), SERIAL_LINE_BIT);

        machine.reset().unwrap();
        assert!(machine.is_running());
        assert_eq!(timer_io.serial_input(), SERIAL_LINE_BIT);
        assert!(timer_io.tty_connected());
        assert_eq!(counters.resets.load(Ordering::SeqCst), 1);

        machine.set_board_mode(BoardMode::Keypad).unwrap();
        assert_eq!(timer_io.serial_input(), 0x00);
        assert!(!timer_io.tty_connected());
        assert_eq!(counters.resets.load(Ordering::SeqCst), 2);
        machine.cancel().unwrap();
    }

    #[test]
    fn load_image_reboots_into_ram() {
        let (mut machine, counters) = scripted_machine(MachineConfig::default(), None);
        machine.load_image(&[0xC3, 0x00, 0x20], 0x2000).unwrap();
        assert!(machine.is_running());
        machine.cancel().unwrap();

        let bus = machine.cpu().unwrap().bus();
        assert_eq!(bus.peek_range(0x2000, 3), Some(&[0xC3, 0x00, 0x20][..]));
        assert_eq!(counters.resets.load(Ordering::SeqCst), 1);

        let rejected = machine.load_image(&[0; 0x10], 0x0100);
        assert!(matches!(rejected, Err(MachineError::Memory(MemoryError::OutsideRam { .. }))));
        assert!(!machine.is_running());
        assert_eq!(counters.resets.load(Ordering::SeqCst), 1);
    }
}
