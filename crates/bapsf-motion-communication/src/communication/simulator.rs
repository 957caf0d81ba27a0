//! In-memory Applied Motion drive
//!
//! [`SimulatedDrive`] implements [`Connector`] and answers the subset of
//! SCL commands the motor driver uses. Moves complete instantly. It is used
//! for dry runs without hardware and by the test suites. [`SimulatedBench`]
//! serves one such drive per IP for multi-axis setups.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use super::transport::{encode_frame, Connector, ReadWrite, FRAME_END, FRAME_HEADER};

#[derive(Debug)]
struct DriveState {
    position: i64,
    target: i64,
    enabled: bool,
    moving: bool,
    alarm_code: String,
    gearing: i64,
    encoder_resolution: i64,
    received: Vec<String>,
    connects: usize,
    refuse_connections: bool,
    fail_writes: usize,
}

impl Default for DriveState {
    fn default() -> Self {
        Self {
            position: 0,
            target: 0,
            enabled: true,
            moving: false,
            alarm_code: "0000".to_string(),
            gearing: 20000,
            encoder_resolution: 4000,
            received: Vec::new(),
            connects: 0,
            refuse_connections: false,
            fail_writes: 0,
        }
    }
}

impl DriveState {
    fn reply(&mut self, command: &str) -> String {
        self.received.push(command.to_string());

        let ack = "%".to_string();
        match command {
            "EG" => format!("EG={}", self.gearing),
            "ER" => format!("ER={}", self.encoder_resolution),
            "IP" => format!("IP={}", self.position),
            "AL" => format!("AL={}", self.alarm_code),
            "RS" => {
                let mut letters = String::new();
                if self.alarm_code != "0000" {
                    letters.push('A');
                }
                letters.push(if self.enabled { 'R' } else { 'D' });
                letters.push(if self.moving { 'F' } else { 'P' });
                format!("RS={letters}")
            }
            "AR" => {
                self.alarm_code = "0000".to_string();
                ack
            }
            "ME" => {
                self.enabled = true;
                ack
            }
            "MD" => {
                self.enabled = false;
                ack
            }
            "FP" => {
                if self.enabled {
                    self.position = self.target;
                }
                ack
            }
            "SK" => {
                self.moving = false;
                ack
            }
            "SP0" | "EP0" => {
                self.position = 0;
                ack
            }
            "IFD" => ack,
            cmd if cmd.starts_with("DI") => match cmd[2..].parse() {
                Ok(target) => {
                    self.target = target;
                    ack
                }
                Err(_) => "?".to_string(),
            },
            cmd if ["VE", "AC", "DE"].iter().any(|p| cmd.starts_with(p)) => ack,
            _ => "?".to_string(),
        }
    }
}

/// Handle to a simulated drive; clones share the same drive
#[derive(Debug, Clone, Default)]
pub struct SimulatedDrive {
    state: Arc<Mutex<DriveState>>,
}

impl SimulatedDrive {
    /// New enabled drive at position 0 with 20000 steps/rev gearing
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gearing (steps per revolution) reported by `EG`
    pub fn with_gearing(self, gearing: i64) -> Self {
        self.state.lock().gearing = gearing;
        self
    }

    /// Current position in steps
    pub fn position(&self) -> i64 {
        self.state.lock().position
    }

    /// Force the position in steps
    pub fn set_position(&self, steps: i64) {
        self.state.lock().position = steps;
    }

    /// Set the 4 digit alarm code reported by `AL`
    pub fn set_alarm_code(&self, code: &str) {
        self.state.lock().alarm_code = code.to_string();
    }

    /// Flag the drive as moving (status letter `F`)
    pub fn set_moving(&self, moving: bool) {
        self.state.lock().moving = moving;
    }

    /// Every command payload received so far
    pub fn received(&self) -> Vec<String> {
        self.state.lock().received.clone()
    }

    /// Number of successful connections opened
    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    /// Refuse (or accept again) new connections
    pub fn refuse_connections(&self, refuse: bool) {
        self.state.lock().refuse_connections = refuse;
    }

    /// Make the next `count` writes fail with a broken pipe
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().fail_writes = count;
    }
}

impl Connector for SimulatedDrive {
    fn connect(&self, _ip: &str, _port: u16, _timeout: Duration) -> io::Result<Box<dyn ReadWrite>> {
        let mut state = self.state.lock();
        if state.refuse_connections {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        }
        state.connects += 1;

        Ok(Box::new(SimulatedStream {
            drive: Arc::clone(&self.state),
            inbox: Vec::new(),
            outbox: VecDeque::new(),
        }))
    }
}

/// A bench of simulated drives keyed by IP, created on first connection
#[derive(Debug, Clone, Default)]
pub struct SimulatedBench {
    drives: Arc<Mutex<HashMap<String, SimulatedDrive>>>,
}

impl SimulatedBench {
    pub fn new() -> Self {
        Self::default()
    }

    /// The drive answering at `ip`
    pub fn drive(&self, ip: &str) -> SimulatedDrive {
        self.drives.lock().entry(ip.to_string()).or_default().clone()
    }

    /// IPs of every drive connected so far, sorted
    pub fn ips(&self) -> Vec<String> {
        let mut ips: Vec<String> = self.drives.lock().keys().cloned().collect();
        ips.sort_unstable();
        ips
    }
}

impl Connector for SimulatedBench {
    fn connect(&self, ip: &str, port: u16, timeout: Duration) -> io::Result<Box<dyn ReadWrite>> {
        self.drive(ip).connect(ip, port, timeout)
    }
}

struct SimulatedStream {
    drive: Arc<Mutex<DriveState>>,
    inbox: Vec<u8>,
    outbox: VecDeque<u8>,
}

impl SimulatedStream {
    fn process_inbox(&mut self) {
        loop {
            let Some(start) = self
                .inbox
                .windows(FRAME_HEADER.len())
                .position(|w| w == FRAME_HEADER)
            else {
                return;
            };
            let body = start + FRAME_HEADER.len();
            let Some(len) = self.inbox[body..].iter().position(|&b| b == FRAME_END) else {
                return;
            };

            let command = String::from_utf8_lossy(&self.inbox[body..body + len]).into_owned();
            self.inbox.drain(..body + len + 1);

            let reply = self.drive.lock().reply(&command);
            self.outbox.extend(encode_frame(&reply));
        }
    }
}

impl Write for SimulatedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        {
            let mut drive = self.drive.lock();
            if drive.fail_writes > 0 {
                drive.fail_writes -= 1;
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
        }
        self.inbox.extend_from_slice(buf);
        self.process_inbox();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for SimulatedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.outbox.is_empty() {
            return Err(io::Error::from(io::ErrorKind::TimedOut));
        }
        let n = buf.len().min(self.outbox.len());
        for (slot, byte) in buf.iter_mut().zip(self.outbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}
