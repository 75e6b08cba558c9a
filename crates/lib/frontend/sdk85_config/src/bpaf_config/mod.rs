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

    sdk85_config::bpaf_config::mod.rs

    Command line arguments. Every argument here overrides the matching
    setting from the configuration file.

*/

use std::path::PathBuf;

use bpaf::Bpaf;
use sdk85_core::machine_types::BoardMode;

#[derive(Bpaf, Debug, Default)]
#[bpaf(options, version, generate(cli_args))]
pub struct CmdLineArgs {
    #[bpaf(long("config_file"), long("configfile"))]
    pub config_file: Option<PathBuf>,

    /// Monitor ROM image, loaded at address 0
    #[bpaf(long)]
    pub rom: Option<PathBuf>,

    /// Program image to load into RAM after boot
    #[bpaf(long)]
    pub program: Option<PathBuf>,

    /// Load address of the program image, in hex
    #[bpaf(long("program_address"), long("org"))]
    pub program_address: Option<String>,

    /// Console to boot into: keypad or tty
    #[bpaf(long)]
    pub mode: Option<BoardMode>,

    #[bpaf(long)]
    pub clock_report_cycles: Option<u64>,

    /// Idle time before the emulator pauses, in seconds. 0 disables
    #[bpaf(long("watchdog_interval"), long("watchdog"))]
    pub watchdog_interval: Option<f64>,

    #[bpaf(long("log_level"), long("loglevel"))]
    pub log_level: Option<String>,
}
