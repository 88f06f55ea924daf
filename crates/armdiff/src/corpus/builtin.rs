use super::CorpusEntry;

/// A corpus compiled into the binary.
#[derive(Clone, Copy, Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub description: &'static str,
    table: &'static [(&'static [u8], &'static str)],
}

impl Builtin {
    pub fn entries(&self) -> Vec<CorpusEntry> {
        self.table
            .iter()
            .map(|&(opcode, mnemonic)| CorpusEntry::new(opcode, mnemonic))
            .collect()
    }

    pub const fn len(&self) -> usize {
        self.table.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "thumb-loadstore",
        description: "Thumb loads and stores in offset, pre- and post-indexed forms",
        table: THUMB_LOADSTORE,
    },
    Builtin {
        name: "thumb-dataproc",
        description: "Flag-setting data processing, SP arithmetic, push/pop, literal loads",
        table: THUMB_DATAPROC,
    },
];

const THUMB_LOADSTORE: &[(&[u8], &str)] = &[
    // adr
    (b"\x08\xa0", "adr r0, 0x20"),
    // ldm
    (b"\x91\xe8\x3c\x00", "ldm r1, {r2, r3, r4, r5}"),
    (b"\x3c\xc9", "ldm r1!, {r2, r3, r4, r5}"),
    // ldr
    (b"\x08\x68", "ldr r0, [r1]"),
    (b"\x48\x68", "ldr r0, [r1, #0x4]"),
    (b"\x51\xf8\x04\x0c", "ldr r0, [r1, #-0x4]"),
    (b"\x51\xf8\x00\x0f", "ldr r0, [r1]!"),
    (b"\x51\xf8\x04\x0f", "ldr r0, [r1, #0x4]!"),
    (b"\x51\xf8\x04\x0d", "ldr r0, [r1, #-0x4]!"),
    (b"\x51\xf8\x04\x0b", "ldr r0, [r1], #0x4"),
    (b"\x51\xf8\x04\x09", "ldr r0, [r1], #-0x4"),
    (b"\xd1\xf8\x00\xd0", "ldr sp, [r1]"),
    (b"\x00\x98", "ldr r0, [sp]"),
    // ldrb
    (b"\x08\x78", "ldrb r0, [r1]"),
    (b"\x08\x79", "ldrb r0, [r1, #0x4]"),
    (b"\x11\xf8\x04\x0c", "ldrb r0, [r1, #-0x4]"),
    (b"\x11\xf8\x00\x0f", "ldrb r0, [r1]!"),
    (b"\x11\xf8\x04\x0f", "ldrb r0, [r1, #0x4]!"),
    (b"\x11\xf8\x04\x0d", "ldrb r0, [r1, #-0x4]!"),
    (b"\x11\xf8\x04\x0b", "ldrb r0, [r1], #0x4"),
    (b"\x11\xf8\x04\x09", "ldrb r0, [r1], #-0x4"),
    // ldrd
    (b"\xd1\xe9\x00\x02", "ldrd r0, r2, [r1]"),
    (b"\xd1\xe9\x01\x02", "ldrd r0, r2, [r1, #0x4]"),
    (b"\x51\xe9\x01\x02", "ldrd r0, r2, [r1, #-0x4]"),
    (b"\xf1\xe9\x00\x02", "ldrd r0, r2, [r1]!"),
    (b"\xf1\xe9\x01\x02", "ldrd r0, r2, [r1, #0x4]!"),
    (b"\x71\xe9\x01\x02", "ldrd r0, r2, [r1, #-0x4]!"),
    (b"\xf1\xe8\x01\x02", "ldrd r0, r2, [r1], #0x4"),
    (b"\x71\xe8\x01\x02", "ldrd r0, r2, [r1], #-0x4"),
    // stm
    (b"\x81\xe8\x3c\x00", "stm r1, {r2, r3, r4, r5}"),
    (b"\x3c\xc1", "stm r1!, {r2, r3, r4, r5}"),
    // str
    (b"\x08\x60", "str r0, [r1]"),
    (b"\x48\x60", "str r0, [r1, #0x4]"),
    (b"\x41\xf8\x04\x0c", "str r0, [r1, #-0x4]"),
    (b"\x41\xf8\x00\x0f", "str r0, [r1]!"),
    (b"\x41\xf8\x04\x0f", "str r0, [r1, #0x4]!"),
    (b"\x41\xf8\x04\x0d", "str r0, [r1, #-0x4]!"),
    (b"\x41\xf8\x04\x0b", "str r0, [r1], #0x4"),
    (b"\x41\xf8\x04\x09", "str r0, [r1], #-0x4"),
    (b"\xc1\xf8\x00\xd0", "str sp, [r1]"),
    (b"\x00\x90", "str r0, [sp]"),
    // strb
    (b"\x08\x70", "strb r0, [r1]"),
    (b"\x08\x71", "strb r0, [r1, #0x4]"),
    (b"\x01\xf8\x04\x0c", "strb r0, [r1, #-0x4]"),
    (b"\x01\xf8\x00\x0f", "strb r0, [r1]!"),
    (b"\x01\xf8\x04\x0f", "strb r0, [r1, #0x4]!"),
    (b"\x01\xf8\x04\x0d", "strb r0, [r1, #-0x4]!"),
    (b"\x01\xf8\x04\x0b", "strb r0, [r1], #0x4"),
    (b"\x01\xf8\x04\x09", "strb r0, [r1], #-0x4"),
    // strd
    (b"\xc1\xe9\x00\x02", "strd r0, r2, [r1]"),
    (b"\xc1\xe9\x01\x02", "strd r0, r2, [r1, #0x4]"),
    (b"\x41\xe9\x01\x02", "strd r0, r2, [r1, #-0x4]"),
    (b"\xe1\xe9\x00\x02", "strd r0, r2, [r1]!"),
    (b"\xe1\xe9\x01\x02", "strd r0, r2, [r1, #0x4]!"),
    (b"\x61\xe9\x01\x02", "strd r0, r2, [r1, #-0x4]!"),
    (b"\xe1\xe8\x01\x02", "strd r0, r2, [r1], #0x4"),
    (b"\x61\xe8\x01\x02", "strd r0, r2, [r1], #-0x4"),
    // strh
    (b"\x08\x80", "strh r0, [r1]"),
    (b"\x88\x80", "strh r0, [r1, #0x4]"),
    (b"\x21\xf8\x04\x0c", "strh r0, [r1, #-0x4]"),
    (b"\x21\xf8\x00\x0f", "strh r0, [r1]!"),
    (b"\x21\xf8\x04\x0f", "strh r0, [r1, #0x4]!"),
    (b"\x21\xf8\x04\x0d", "strh r0, [r1, #-0x4]!"),
    (b"\x21\xf8\x04\x0b", "strh r0, [r1], #0x4"),
    (b"\x21\xf8\x04\x09", "strh r0, [r1], #-0x4"),
];

const THUMB_DATAPROC: &[(&[u8], &str)] = &[
    // immediate forms
    (b"\x2a\x20", "movs r0, #0x2a"),
    (b"\x00\x22", "movs r2, #0x0"),
    (b"\x00\x28", "cmp r0, #0x0"),
    (b"\x01\x30", "adds r0, #0x1"),
    (b"\x28\x39", "subs r1, #0x28"),
    (b"\x88\x18", "adds r0, r1, r2"),
    (b"\x88\x1a", "subs r0, r1, r2"),
    (b"\xc8\x1d", "adds r0, r1, #0x7"),
    (b"\xc8\x1f", "subs r0, r1, #0x7"),
    // shifts by immediate
    (b"\x08\x01", "lsls r0, r1, #0x4"),
    (b"\x48\x08", "lsrs r0, r1, #0x1"),
    (b"\x08\x10", "asrs r0, r1, #0x20"),
    (b"\x08\x00", "movs r0, r1"),
    // register alu
    (b"\x08\x40", "ands r0, r1"),
    (b"\x48\x40", "eors r0, r1"),
    (b"\x88\x40", "lsls r0, r1"),
    (b"\xc8\x40", "lsrs r0, r1"),
    (b"\x08\x41", "asrs r0, r1"),
    (b"\x48\x41", "adcs r0, r1"),
    (b"\x88\x41", "sbcs r0, r1"),
    (b"\xc8\x41", "rors r0, r1"),
    (b"\x08\x42", "tst r0, r1"),
    (b"\x48\x42", "rsbs r0, r1, #0x0"),
    (b"\x88\x42", "cmp r0, r1"),
    (b"\xc8\x42", "cmn r0, r1"),
    (b"\x08\x43", "orrs r0, r1"),
    (b"\x48\x43", "muls r0, r1, r0"),
    (b"\x88\x43", "bics r0, r1"),
    (b"\xc8\x43", "mvns r0, r1"),
    // high registers
    (b"\x40\x44", "add r0, r8"),
    (b"\x88\x46", "mov r8, r1"),
    (b"\x40\x45", "cmp r0, r8"),
    (b"\x78\x44", "add r0, pc"),
    (b"\x68\x46", "mov r0, sp"),
    // sp arithmetic
    (b"\x04\xa8", "add r0, sp, #0x10"),
    (b"\x02\xb0", "add sp, #0x8"),
    (b"\x82\xb0", "sub sp, #0x8"),
    (b"\x10\xb5", "push {r4, lr}"),
    (b"\x0c\xbc", "pop {r2, r3}"),
    // loads
    (b"\x01\x48", "ldr r0, [pc, #0x4]"),
    (b"\x48\x88", "ldrh r0, [r1, #0x2]"),
    (b"\x02\x9a", "ldr r2, [sp, #0x8]"),
    (b"\x01\x92", "str r2, [sp, #0x4]"),
    (b"\x01\xa1", "adr r1, 0x4"),
    (b"\x91\xf9\x60\x00", "ldrsb r0, [r1, #0x60]"),
    (b"\xb1\xf9\xa0\x00", "ldrsh r0, [r1, #0xa0]"),
    // multiple
    (b"\x21\xe9\x0c\x00", "stmdb r1!, {r2, r3}"),
    (b"\x11\xe9\x0c\x00", "ldmdb r1, {r2, r3}"),
];
