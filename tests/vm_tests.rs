// tests/vm_tests.rs

#[cfg(test)]
mod tests {
    use lc3_vm::io::BufferConsole;
    use lc3_vm::state::{Flag, Register};
    use lc3_vm::vm::{RunState, VirtualMachine, VmError, PC_START};

    // Helper: machine with `code` at PC_START and an empty console.
    fn machine_with(code: &[u16]) -> VirtualMachine<BufferConsole> {
        let mut vm = VirtualMachine::new(BufferConsole::default());
        vm.load(PC_START, code).expect("program fits");
        vm
    }

    fn flags(vm: &VirtualMachine<BufferConsole>) -> u16 {
        vm.registers.flags()
    }

    #[test]
    fn test_power_on_state() {
        let vm = VirtualMachine::new(BufferConsole::default());
        assert_eq!(vm.registers.pc(), 0x3000);
        assert_eq!(flags(&vm), Flag::Zro.bits());
        assert_eq!(vm.state(), RunState::Running);
        assert_eq!(vm.steps(), 0);
    }

    // --- Operate ---

    #[test]
    fn test_add_immediate() {
        let mut vm = machine_with(&[0x1025]); // ADD R0, R0, #5
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R0), 5);
        assert_eq!(flags(&vm), Flag::Pos.bits());
        assert_eq!(vm.registers.pc(), 0x3001);
    }

    #[test]
    fn test_add_negative_immediate_to_zero() {
        let mut vm = machine_with(&[0x127F]); // ADD R1, R1, #-1
        vm.registers.set(Register::R1, 1);
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R1), 0);
        assert_eq!(flags(&vm), Flag::Zro.bits());
    }

    #[test]
    fn test_add_registers_wraps() {
        let mut vm = machine_with(&[0x1401]); // ADD R2, R0, R1
        vm.registers.set(Register::R0, 0x7FFF);
        vm.registers.set(Register::R1, 0x0001);
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R2), 0x8000);
        assert_eq!(flags(&vm), Flag::Neg.bits());

        let mut vm = machine_with(&[0x1401]);
        vm.registers.set(Register::R0, 0xFFFF);
        vm.registers.set(Register::R1, 0x0001);
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R2), 0);
        assert_eq!(flags(&vm), Flag::Zro.bits());
    }

    #[test]
    fn test_and_is_bitwise_not_addition() {
        let mut vm = machine_with(&[0x5401]); // AND R2, R0, R1
        vm.registers.set(Register::R0, 0x0F0F);
        vm.registers.set(Register::R1, 0x00FF);
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R2), 0x000F);
        assert_eq!(flags(&vm), Flag::Pos.bits());
    }

    #[test]
    fn test_and_immediate_clears_and_sign_extends() {
        let mut vm = machine_with(&[0x5020, 0x507F]); // AND R0,R0,#0 ; AND R0,R1,#-1
        vm.registers.set(Register::R0, 0x1234);
        vm.registers.set(Register::R1, 0xABCD);
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R0), 0);
        assert_eq!(flags(&vm), Flag::Zro.bits());
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R0), 0xABCD);
        assert_eq!(flags(&vm), Flag::Neg.bits());
    }

    #[test]
    fn test_not() {
        let mut vm = machine_with(&[0x923F]); // NOT R1, R0
        vm.registers.set(Register::R0, 0x0F0F);
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R1), 0xF0F0);
        assert_eq!(flags(&vm), Flag::Neg.bits());
    }

    // --- Control Flow ---

    #[test]
    fn test_br_taken_forward() {
        let mut vm = machine_with(&[0x0203]); // BRp #3
        vm.registers.set(Register::Cond, Flag::Pos.bits());
        vm.step().unwrap();
        assert_eq!(vm.registers.pc(), 0x3004);
    }

    #[test]
    fn test_br_taken_backward() {
        let mut vm = machine_with(&[0x09FE]); // BRn #-2
        vm.registers.set(Register::Cond, Flag::Neg.bits());
        vm.step().unwrap();
        assert_eq!(vm.registers.pc(), 0x2FFF);
    }

    #[test]
    fn test_br_not_taken_leaves_pc() {
        let mut vm = machine_with(&[0x0203]); // BRp #3, but COND = Z
        vm.step().unwrap();
        assert_eq!(vm.registers.pc(), 0x3001);

        let mut vm = machine_with(&[0x0003]); // no condition bits: never taken
        vm.registers.set(Register::Cond, Flag::Pos.bits());
        vm.step().unwrap();
        assert_eq!(vm.registers.pc(), 0x3001);
    }

    #[test]
    fn test_br_any_matching_flag() {
        for flag in [Flag::Pos, Flag::Zro, Flag::Neg] {
            let mut vm = machine_with(&[0x0E02]); // BRnzp #2
            vm.registers.set(Register::Cond, flag.bits());
            vm.step().unwrap();
            assert_eq!(vm.registers.pc(), 0x3003, "flag {:?}", flag);
        }
    }

    #[test]
    fn test_br_wraps_around_address_space() {
        let mut vm = VirtualMachine::new(BufferConsole::default());
        vm.memory.write(0xFFFF, 0x0E01); // BRnzp #1
        vm.registers.set_pc(0xFFFF);
        vm.step().unwrap();
        assert_eq!(vm.registers.pc(), 0x0001);
    }

    #[test]
    fn test_jmp_and_ret() {
        let mut vm = machine_with(&[0xC0C0]); // JMP R3
        vm.registers.set(Register::R3, 0x4242);
        vm.step().unwrap();
        assert_eq!(vm.registers.pc(), 0x4242);

        let mut vm = machine_with(&[0xC1C0]); // RET
        vm.registers.set(Register::R7, 0x3456);
        vm.step().unwrap();
        assert_eq!(vm.registers.pc(), 0x3456);
    }

    #[test]
    fn test_jsr_offset_saves_return_address() {
        let mut vm = machine_with(&[0x480A]); // JSR #10
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R7), 0x3001);
        assert_eq!(vm.registers.pc(), 0x300B);

        let mut vm = machine_with(&[0x4FFF]); // JSR #-1
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R7), 0x3001);
        assert_eq!(vm.registers.pc(), 0x3000);
    }

    #[test]
    fn test_jsrr_saves_return_address() {
        let mut vm = machine_with(&[0x4080]); // JSRR R2
        vm.registers.set(Register::R2, 0x5000);
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R7), 0x3001);
        assert_eq!(vm.registers.pc(), 0x5000);
    }

    #[test]
    fn test_jsrr_through_r7_lands_on_return_address() {
        let mut vm = machine_with(&[0x41C0]); // JSRR R7
        vm.registers.set(Register::R7, 0x4000);
        vm.step().unwrap();
        assert_eq!(vm.registers.pc(), 0x3001);
        assert_eq!(vm.registers.get(Register::R7), 0x3001);
    }

    #[test]
    fn test_control_flow_leaves_flags() {
        let mut vm = machine_with(&[0x480A]);
        vm.registers.set(Register::Cond, Flag::Neg.bits());
        vm.step().unwrap();
        assert_eq!(flags(&vm), Flag::Neg.bits());
    }

    // --- Loads ---

    #[test]
    fn test_ld_pc_relative() {
        // LD R0, #2 reads 0x3003; LD R1, #-3 reads 0x2FFF
        let mut vm = machine_with(&[0x2002, 0x23FD, 0x0000, 0x8001]);
        vm.memory.write(0x2FFF, 0x0042);
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R0), 0x8001);
        assert_eq!(flags(&vm), Flag::Neg.bits());
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R1), 0x0042);
        assert_eq!(flags(&vm), Flag::Pos.bits());
    }

    #[test]
    fn test_ldi_double_indirection() {
        let mut vm = machine_with(&[0xA001, 0x0000, 0x4000]); // LDI R0, #1
        vm.memory.write(0x4000, 0xBEEF);
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R0), 0xBEEF);
        assert_eq!(flags(&vm), Flag::Neg.bits());
    }

    #[test]
    fn test_ldr_base_offset() {
        let mut vm = machine_with(&[0x6043]); // LDR R0, R1, #3
        vm.registers.set(Register::R1, 0x4000);
        vm.memory.write(0x4003, 0x0007);
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R0), 7);
        assert_eq!(flags(&vm), Flag::Pos.bits());
    }

    #[test]
    fn test_ldr_wraps_below_zero() {
        let mut vm = machine_with(&[0x607F]); // LDR R0, R1, #-1
        vm.registers.set(Register::R1, 0x0000);
        vm.memory.write(0xFFFF, 0x1234);
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R0), 0x1234);
    }

    #[test]
    fn test_lea_computes_address_only() {
        let mut vm = machine_with(&[0xE004, 0xE1FF]); // LEA R0, #4 ; LEA R0, #-1
        vm.memory.write(0x3005, 0xFFFF);
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R0), 0x3005);
        assert_eq!(flags(&vm), Flag::Pos.bits());
        vm.step().unwrap();
        assert_eq!(vm.registers.get(Register::R0), 0x3001);
    }

    // --- Stores ---

    #[test]
    fn test_st_leaves_flags() {
        let mut vm = machine_with(&[0x3003]); // ST R0, #3
        vm.registers.set(Register::R0, 0xFFFF);
        vm.step().unwrap();
        assert_eq!(vm.memory.read(0x3004), 0xFFFF);
        assert_eq!(flags(&vm), Flag::Zro.bits());
    }

    #[test]
    fn test_sti_stores_through_pointer() {
        let mut vm = machine_with(&[0xB001, 0x0000, 0x4100]); // STI R0, #1
        vm.registers.set(Register::R0, 0x0099);
        vm.step().unwrap();
        assert_eq!(vm.memory.read(0x4100), 0x0099);
        assert_eq!(vm.memory.read(0x3002), 0x4100);
    }

    #[test]
    fn test_str_base_offset() {
        let mut vm = machine_with(&[0x7042]); // STR R0, R1, #2
        vm.registers.set(Register::R0, 0x0055);
        vm.registers.set(Register::R1, 0x5000);
        vm.step().unwrap();
        assert_eq!(vm.memory.read(0x5002), 0x0055);
    }

    // --- Fatal decode ---

    #[test]
    fn test_rti_is_fatal() {
        let mut vm = machine_with(&[0x8000, 0xF025]);
        let result = vm.run();
        assert!(matches!(result, Err(VmError::IllegalOpcode { opcode: 8, word: 0x8000 })));
        assert!(!vm.is_halted());
        assert_eq!(vm.steps(), 0);
    }

    #[test]
    fn test_reserved_opcode_is_fatal() {
        let mut vm = machine_with(&[0xD123]);
        let result = vm.run();
        assert!(matches!(result, Err(VmError::IllegalOpcode { opcode: 13, .. })));
        assert!(result.unwrap_err().is_fatal_decode());
        assert_eq!(vm.registers.pc(), 0x3001);
    }

    #[test]
    fn test_unknown_trap_is_fatal() {
        let mut vm = machine_with(&[0xF030]);
        vm.registers.set(Register::R7, 0x1111);
        let result = vm.run();
        assert!(matches!(result, Err(VmError::UnknownTrap(0x30))));
        assert_eq!(vm.registers.get(Register::R7), 0x1111);
    }

    #[test]
    fn test_console_error_keeps_cause_as_source() {
        use std::error::Error;

        let err = VmError::from(std::io::Error::new(std::io::ErrorKind::Other, "tty gone"));
        assert!(matches!(err, VmError::Io(_)));
        assert_eq!(err.to_string(), "console i/o error");
        assert_eq!(err.source().map(|e| e.to_string()), Some("tty gone".to_string()));
    }
}
