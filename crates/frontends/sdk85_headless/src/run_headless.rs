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

    run_headless.rs

    The interactive command loop. Commands arrive line by line over a
    channel, and between commands the loop drains machine events so the
    display and teletype output are echoed as they happen.

*/

use std::{
    io::{self, BufRead, Write},
    thread,
    time::Duration,
};

use anyhow::Context;
use colored::*;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use sdk85_core::machine_types::MachineEvent;

use crate::{
    command::{Command, HELP_TEXT},
    emulator::{render_latches, Emulator},
    load_file,
};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Forward stdin lines to the command loop from a background thread.
pub fn spawn_stdin_reader() -> io::Result<Receiver<String>> {
    let (sender, receiver) = crossbeam_channel::unbounded();
    thread::Builder::new().name("stdin".to_string()).spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line
            else {
                break;
            };
            if sender.send(line).is_err() {
                break;
            }
        }
    })?;
    Ok(receiver)
}

/// Run commands from `input` until it closes or a quit command arrives.
pub fn run_headless(emu: &mut Emulator, input: Receiver<String>, default_address: u16) {
    loop {
        match input.recv_timeout(POLL_INTERVAL) {
            Ok(line) => match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(command) => {
                    if let Err(e) = execute(emu, command, default_address) {
                        println!("{}", format!("{:#}", e).red());
                    }
                }
                Err(e) => println!("{}", e.red()),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        echo_events(emu);
    }

    if let Err(e) = emu.machine.cancel() {
        log::error!("Failed to stop the machine: {}", e);
    }
}

fn execute(emu: &mut Emulator, command: Command, default_address: u16) -> Result<(), anyhow::Error> {
    match command {
        Command::Keys(keys) => {
            for key in keys {
                emu.press_key(key)?;
                // Give the monitor a moment to take each interrupt.
                thread::sleep(POLL_INTERVAL);
                echo_events(emu);
            }
        }
        Command::Type(text) => {
            emu.type_str(&text)?;
        }
        Command::Reset => emu.reset()?,
        Command::Mode(mode) => {
            emu.set_board_mode(mode)?;
            println!("Console: {:?}", mode);
        }
        Command::Load(path, address) => {
            let image = load_file(&path)?;
            let address = address.unwrap_or(default_address);
            emu.load_program(&image, address)
                .with_context(|| format!("Loading '{}' at {:04X}", path.display(), address))?;
            println!("Loaded {} bytes at {:04X}", image.len(), address);
        }
        Command::Show => println!("{}", emu.status_line()),
        Command::Transcript => println!("{}", emu.transcript),
        Command::Ports => {
            if let Some(cpu) = emu.machine.cpu() {
                for (name, port) in cpu.bus().dump_io_ports() {
                    println!("{:02X}  {}", port, name);
                }
            }
            else {
                println!("Ports are unavailable while the CPU is running.");
            }
        }
        Command::Help => println!("{}", HELP_TEXT),
        Command::Quit | Command::Nothing => {}
    }
    Ok(())
}

fn echo_events(emu: &mut Emulator) {
    let flags = emu.flags;
    for event in emu.pump_events() {
        match event {
            MachineEvent::Display(latches) if flags.echo_display => println!("{}", render_latches(&latches)),
            MachineEvent::SerialOut(c) if flags.echo_tty => {
                print!("{}", c);
                _ = io::stdout().flush();
            }
            MachineEvent::Halted => println!("{} {}", emu.render_display(), "CPU halted".red()),
            _ => {}
        }
    }
}
