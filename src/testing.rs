//! Host-side fakes for the kernel collaborators.
//!
//! `UserImage` is a small flat user address space with per-page mapping,
//! enough to lay out call frames, strings and buffers the way a user stack
//! would. The device and scheduler fakes record what they were asked to do.
//! `Rig` bundles all of them around one dispatcher.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use crate::drivers::{Console, Devices, Keyboard, Power};
use crate::fs::memfs::{MemFile, MemFs};
use crate::fs::IoGuard;
use crate::mm::{AddressSpace, VirtAddr, PAGE_SIZE};
use crate::process::{Pid, Process, ProcessControl};
use crate::syscall::{Flow, IntrFrame, Syscalls};

/// Where test images are mapped: the classic ELF load address.
pub const IMAGE_BASE: usize = 0x0804_8000;

/// Size of a test image.
pub const IMAGE_SIZE: usize = 16 * PAGE_SIZE;

/// Written to `eax` before every call, so untouched results stand out.
pub const EAX_POISON: u32 = 0xcccc_cccc;

pub fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

// ---------------------------------------------------------------------------
// User memory
// ---------------------------------------------------------------------------

/// A flat user image at [`IMAGE_BASE`] with a bump allocator for test data.
pub struct UserImage {
    bytes: Vec<u8>,
    mapped: Vec<bool>,
    next: usize,
}

impl UserImage {
    pub fn new() -> Self {
        Self {
            bytes: vec![0; IMAGE_SIZE],
            mapped: vec![true; IMAGE_SIZE / PAGE_SIZE],
            next: 0,
        }
    }

    /// One past the last mapped address.
    pub fn end(&self) -> usize {
        IMAGE_BASE + IMAGE_SIZE
    }

    /// Make the page containing `addr` inaccessible.
    pub fn unmap_page(&mut self, addr: usize) {
        self.mapped[(addr - IMAGE_BASE) / PAGE_SIZE] = false;
    }

    /// Copy `data` into the image and return its user address.
    pub fn push_bytes(&mut self, data: &[u8]) -> u32 {
        let offset = self.next;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        self.next = (offset + data.len() + 3) & !3;
        (IMAGE_BASE + offset) as u32
    }

    pub fn push_cstr(&mut self, s: &str) -> u32 {
        let mut data = s.as_bytes().to_vec();
        data.push(0);
        self.push_bytes(&data)
    }

    /// Lay out a call frame and return the stack pointer that points at it.
    pub fn push_words(&mut self, words: &[u32]) -> u32 {
        let data: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        self.push_bytes(&data)
    }

    /// Reserve `len` zeroed bytes.
    pub fn alloc(&mut self, len: usize) -> u32 {
        self.push_bytes(&vec![0; len])
    }

    pub fn poke(&mut self, addr: usize, data: &[u8]) {
        let offset = addr - IMAGE_BASE;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
    }

    pub fn peek(&self, addr: usize, len: usize) -> Vec<u8> {
        let offset = addr - IMAGE_BASE;
        self.bytes[offset..offset + len].to_vec()
    }
}

impl AddressSpace for UserImage {
    fn is_user_address(&self, addr: VirtAddr) -> bool {
        let addr = addr.as_usize();
        (IMAGE_BASE..self.end()).contains(&addr) && self.mapped[(addr - IMAGE_BASE) / PAGE_SIZE]
    }

    fn copy_from_user(&self, addr: VirtAddr, buf: &mut [u8]) {
        let offset = addr.as_usize() - IMAGE_BASE;
        buf.copy_from_slice(&self.bytes[offset..offset + buf.len()]);
    }

    fn copy_to_user(&mut self, addr: VirtAddr, data: &[u8]) {
        self.poke(addr.as_usize(), data);
    }
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct TestConsole {
    out: Mutex<Vec<u8>>,
}

impl TestConsole {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.out.lock()).into_owned()
    }
}

impl Console for TestConsole {
    fn write_bytes(&self, buf: &[u8]) {
        self.out.lock().extend_from_slice(buf);
    }
}

/// Keyboard that replays scripted input and then runs dry.
#[derive(Default)]
pub struct TestKeyboard {
    input: Mutex<VecDeque<u8>>,
}

impl TestKeyboard {
    pub fn feed(&self, input: &[u8]) {
        self.input.lock().extend(input.iter().copied());
    }

    pub fn remaining(&self) -> usize {
        self.input.lock().len()
    }
}

impl Keyboard for TestKeyboard {
    fn read_byte(&self) -> Option<u8> {
        self.input.lock().pop_front()
    }
}

#[derive(Default)]
pub struct TestPower {
    off: AtomicBool,
}

impl TestPower {
    pub fn is_off(&self) -> bool {
        self.off.load(Ordering::SeqCst)
    }
}

impl Power for TestPower {
    fn power_off(&self) {
        self.off.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ProcTable {
    programs: Vec<String>,
    executed: Vec<String>,
    children: BTreeMap<Pid, Option<i32>>,
    terminated: Vec<(Pid, i32)>,
    next_pid: Pid,
}

/// Scheduler fake: knows a fixed set of loadable programs and records
/// launches and teardowns.
#[derive(Default)]
pub struct TestProcs {
    table: Mutex<ProcTable>,
}

impl TestProcs {
    pub fn with_programs(programs: &[&str]) -> Self {
        let procs = Self::default();
        procs.table.lock().programs = programs.iter().map(|p| p.to_string()).collect();
        procs
    }

    /// Command lines passed to `execute`, loadable or not.
    pub fn executed(&self) -> Vec<String> {
        self.table.lock().executed.clone()
    }

    /// `(pid, status)` for every `terminate` call, in order.
    pub fn terminated(&self) -> Vec<(Pid, i32)> {
        self.table.lock().terminated.clone()
    }
}

impl ProcessControl for TestProcs {
    fn execute(&self, cmd_line: &str) -> Option<Pid> {
        let mut table = self.table.lock();
        table.executed.push(cmd_line.to_string());
        let program = cmd_line.split_whitespace().next()?;
        if !table.programs.iter().any(|p| p == program) {
            return None;
        }
        table.next_pid += 1;
        let pid = 100 + table.next_pid;
        table.children.insert(pid, None);
        Some(pid)
    }

    /// Children that already exited report their status once; anything
    /// else is -1.
    fn wait(&self, pid: Pid) -> i32 {
        let mut table = self.table.lock();
        match table.children.get(&pid).copied() {
            Some(Some(status)) => {
                table.children.remove(&pid);
                status
            }
            _ => -1,
        }
    }

    fn terminate(&self, pid: Pid, status: i32) {
        let mut table = self.table.lock();
        if let Some(slot) = table.children.get_mut(&pid) {
            *slot = Some(status);
        }
        table.terminated.push((pid, status));
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// One process, one address space, one dispatcher and its collaborators.
pub struct Rig {
    pub sys: Syscalls<MemFs>,
    pub console: &'static TestConsole,
    pub keyboard: &'static TestKeyboard,
    pub power: &'static TestPower,
    pub procs: &'static TestProcs,
    pub mem: UserImage,
    pub process: Process<MemFile>,
    pub frame: IntrFrame,
}

impl Rig {
    pub fn new(name: &str, fs: MemFs) -> Self {
        Self::with_procs(name, fs, TestProcs::default())
    }

    pub fn with_procs(name: &str, fs: MemFs, procs: TestProcs) -> Self {
        let console = leak(TestConsole::default());
        let keyboard = leak(TestKeyboard::default());
        let power = leak(TestPower::default());
        let procs = leak(procs);
        let devices = Devices {
            console,
            keyboard,
            power,
        };
        Self {
            sys: Syscalls::new(fs, procs, devices),
            console,
            keyboard,
            power,
            procs,
            mem: UserImage::new(),
            process: Process::new(name, 1),
            frame: IntrFrame::default(),
        }
    }

    /// Trap with a call frame made of `words`.
    pub fn call(&mut self, words: &[u32]) -> Flow {
        let esp = self.mem.push_words(words);
        self.call_at(esp)
    }

    /// Trap with the stack pointer set to `esp`.
    pub fn call_at(&mut self, esp: u32) -> Flow {
        self.frame = IntrFrame { esp, eax: EAX_POISON };
        self.sys.handle(&mut self.process, &mut self.mem, &mut self.frame)
    }

    /// Trap, expect the process to survive, and return `eax`.
    pub fn value(&mut self, words: &[u32]) -> i32 {
        assert_eq!(self.call(words), Flow::Resume, "process did not survive {:?}", words);
        self.frame.eax as i32
    }

    pub fn cstr(&mut self, s: &str) -> u32 {
        self.mem.push_cstr(s)
    }

    pub fn fs(&self) -> IoGuard<'_, MemFs> {
        self.sys.io().lock()
    }
}
