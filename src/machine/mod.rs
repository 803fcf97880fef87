//! # Machine Module
//!
//! The register file, physical memory, and clock of the simulated
//! machine, together with the exception categories the kernel handles.
//! The machine knows nothing about address translation; virtual accesses
//! go through the kernel, which consults the TLB and the pager.

use log::debug;

/// Page length in bytes, equal to the disk sector size so pages and
/// sectors trade buffers freely.
pub const PAGE_SIZE: usize = crate::dev::SECTOR_SIZE;

/// Default number of physical frames.  The frame pool takes the count as
/// a parameter so small pools can be exercised.
pub const NUM_PHYS_PAGES: usize = 128;

pub const NUM_TOTAL_REGS: usize = 40;

/// Register conventions: r2 carries the syscall code in and the result
/// out; r4 through r7 carry up to four arguments.
pub const RESULT_REG: usize = 2;
pub const ARG1_REG: usize = 4;
pub const ARG2_REG: usize = 5;
pub const ARG3_REG: usize = 6;
pub const ARG4_REG: usize = 7;
pub const STACK_REG: usize = 29;
pub const RET_ADDR_REG: usize = 31;
pub const PC_REG: usize = 34;
pub const NEXT_PC_REG: usize = 35;
pub const PREV_PC_REG: usize = 36;
pub const BAD_VADDR_REG: usize = 39;

/// Categories of control transfer out of user mode.
#[derive(PartialEq,Clone,Copy,Debug)]
pub enum ExceptionKind {
    Syscall,
    PageFault,
    ReadOnly,
    BusError,
    AddressError,
    Overflow,
    IllegalInstruction
}

/// Register file, physical memory, and the simulated tick counter.
pub struct Machine {
    registers: [i32;NUM_TOTAL_REGS],
    pub main_memory: Vec<u8>,
    ticks: u64
}

impl Machine {
    pub fn new(num_phys_pages: usize) -> Self {
        Self {
            registers: [0;NUM_TOTAL_REGS],
            main_memory: vec![0;num_phys_pages*PAGE_SIZE],
            ticks: 0
        }
    }
    pub fn read_register(&self,num: usize) -> i32 {
        assert!(num < NUM_TOTAL_REGS,"register number out of range");
        self.registers[num]
    }
    pub fn write_register(&mut self,num: usize,val: i32) {
        assert!(num < NUM_TOTAL_REGS,"register number out of range");
        self.registers[num] = val;
    }
    pub fn registers(&self) -> &[i32;NUM_TOTAL_REGS] {
        &self.registers
    }
    pub fn load_registers(&mut self,regs: &[i32;NUM_TOTAL_REGS]) {
        self.registers = *regs;
    }
    /// Step the program counter past the instruction that trapped.
    pub fn pc_advance(&mut self) {
        let pc = self.registers[PC_REG];
        let next = self.registers[NEXT_PC_REG];
        self.registers[PREV_PC_REG] = pc;
        self.registers[PC_REG] = next;
        self.registers[NEXT_PC_REG] = next + 4;
        debug!("pc advanced to {}",next);
    }
    /// Advance the simulated clock.
    pub fn tick(&mut self,n: u64) {
        self.ticks += n;
    }
    pub fn total_ticks(&self) -> u64 {
        self.ticks
    }
    /// Physical memory accessors.  An out-of-range address here is a
    /// kernel bug, not a user error.
    pub fn read_phys_byte(&self,addr: usize) -> u8 {
        assert!(addr < self.main_memory.len(),"physical address out of range");
        self.main_memory[addr]
    }
    pub fn write_phys_byte(&mut self,addr: usize,val: u8) {
        assert!(addr < self.main_memory.len(),"physical address out of range");
        self.main_memory[addr] = val;
    }
    /// Copy one frame out of memory.
    pub fn read_frame(&self,frame: usize) -> Vec<u8> {
        let start = frame*PAGE_SIZE;
        assert!(start+PAGE_SIZE <= self.main_memory.len(),"frame number out of range");
        self.main_memory[start..start+PAGE_SIZE].to_vec()
    }
    /// Fill one frame of memory.
    pub fn write_frame(&mut self,frame: usize,dat: &[u8]) {
        let start = frame*PAGE_SIZE;
        assert!(start+PAGE_SIZE <= self.main_memory.len(),"frame number out of range");
        let n = usize::min(dat.len(),PAGE_SIZE);
        self.main_memory[start..start+n].copy_from_slice(&dat[0..n]);
        for i in n..PAGE_SIZE {
            self.main_memory[start+i] = 0;
        }
    }
    pub fn num_phys_pages(&self) -> usize {
        self.main_memory.len()/PAGE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pc_advance_sequence() {
        let mut m = Machine::new(2);
        m.write_register(PC_REG,100);
        m.write_register(NEXT_PC_REG,104);
        m.pc_advance();
        assert_eq!(m.read_register(PREV_PC_REG),100);
        assert_eq!(m.read_register(PC_REG),104);
        assert_eq!(m.read_register(NEXT_PC_REG),108);
    }

    #[test]
    fn frame_copy() {
        let mut m = Machine::new(4);
        m.write_frame(2,&[5;PAGE_SIZE]);
        m.write_frame(3,&[1,2,3]);
        assert_eq!(m.read_frame(2),vec![5;PAGE_SIZE]);
        let short = m.read_frame(3);
        assert_eq!(&short[0..3],&[1,2,3]);
        assert_eq!(short[3],0);
    }
}
