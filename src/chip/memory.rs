use std::ops::Range;

/// A word-addressed memory: one PE's private memory or the external DRAM.
///
/// Samples are stored as the bit patterns of `f32`s; `f32s` and `f32s_mut`
/// give typed views over a word range.
#[derive(Clone, Debug)]
pub struct Memory {
    words: Vec<u32>,
}

impl Memory {
    pub fn new(len: usize) -> Memory {
        Memory {
            words: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn read(&self, addr: usize, len: usize) -> Option<&[u32]> {
        self.words.get(addr..addr.checked_add(len)?)
    }

    /// Copies `data` to `addr`, returning `None` if it would run past the end.
    pub fn write(&mut self, addr: usize, data: &[u32]) -> Option<()> {
        let end = addr.checked_add(data.len())?;
        self.words.get_mut(addr..end)?.copy_from_slice(data);
        Some(())
    }

    pub fn word(&self, addr: usize) -> Option<u32> {
        self.words.get(addr).cloned()
    }

    pub fn set_word(&mut self, addr: usize, value: u32) -> Option<()> {
        *self.words.get_mut(addr)? = value;
        Some(())
    }

    pub fn words(&self, range: Range<usize>) -> &[u32] {
        &self.words[range]
    }

    pub fn f32s(&self, range: Range<usize>) -> &[f32] {
        bytemuck::cast_slice(&self.words[range])
    }

    pub fn f32s_mut(&mut self, range: Range<usize>) -> &mut [f32] {
        bytemuck::cast_slice_mut(&mut self.words[range])
    }

    /// Stores `data` as f32 bit patterns starting at `addr`.
    pub fn write_f32s(&mut self, addr: usize, data: &[f32]) -> Option<()> {
        self.write(addr, bytemuck::cast_slice(data))
    }
}
