#![no_main]

use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;

use segfit::{ArenaSource, Segfit};

use libfuzzer_sys::fuzz_target;

use libfuzzer_sys::arbitrary::Arbitrary;

const ARENA_SIZE: usize = 1 << 20;

#[derive(Arbitrary, Debug)]
enum Action {
    /// Allocate `size` bytes and fill them with a marker
    Malloc { size: u16 },
    /// Free the ith live allocation
    Free { index: u8 },
    /// Realloc the ith live allocation
    Realloc { index: u8, new_size: u16 },
}
use Action::*;

fuzz_target!(|actions: Vec<Action>| {
    let arena_layout = Layout::from_size_align(ARENA_SIZE, 8).unwrap();
    let arena = unsafe { alloc(arena_layout) };
    assert!(!arena.is_null());

    let mut heap = Segfit::new(unsafe { ArenaSource::new(arena, ARENA_SIZE) });
    heap.init().unwrap();

    // (payload, request size, fill byte)
    let mut allocations: Vec<(NonNull<u8>, usize, u8)> = vec![];

    for (step, action) in actions.into_iter().enumerate() {
        match action {
            Malloc { size } => {
                if size == 0 {
                    continue;
                }

                if let Ok(ptr) = heap.malloc(size as usize) {
                    assert!(ptr.as_ptr() as usize % 8 == 0);
                    let fill = step as u8;
                    unsafe { ptr.as_ptr().write_bytes(fill, size as usize) };
                    allocations.push((ptr, size as usize, fill));
                }
            }
            Free { index } => {
                if index as usize >= allocations.len() {
                    continue;
                }

                let (ptr, size, fill) = allocations.swap_remove(index as usize);
                for i in 0..size {
                    assert_eq!(unsafe { ptr.as_ptr().add(i).read() }, fill);
                }
                unsafe { heap.free(ptr) };
            }
            Realloc { index, new_size } => {
                if index as usize >= allocations.len() || new_size == 0 {
                    continue;
                }

                let (ptr, size, fill) = allocations[index as usize];

                if let Ok(new) = unsafe { heap.realloc(ptr.as_ptr(), new_size as usize) } {
                    for i in 0..size.min(new_size as usize) {
                        assert_eq!(unsafe { new.as_ptr().add(i).read() }, fill);
                    }
                    unsafe { new.as_ptr().write_bytes(fill, new_size as usize) };
                    allocations[index as usize] = (new, new_size as usize, fill);
                }
            }
        }
    }

    // free everything that survived, verifying payloads one last time
    for (ptr, size, fill) in allocations {
        for i in 0..size {
            assert_eq!(unsafe { ptr.as_ptr().add(i).read() }, fill);
        }
        unsafe { heap.free(ptr) };
    }

    unsafe { dealloc(arena, arena_layout) };
});
