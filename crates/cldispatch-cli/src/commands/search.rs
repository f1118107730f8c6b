//! `cldispatch search`: count keyword occurrences across a text file.
//!
//! Partitions the corpus over a device-sized NDRange and runs the
//! `string_search` kernel, which tallies matches per work-group in local
//! memory before folding them into four global counters.

use anyhow::{bail, Context, Result};
use clap::Parser;
use cldispatch::{
    AccessMode, CompiledProgram, DeviceBuffer, DispatchConfig, DispatchContext, KernelHandle,
    ProgramSource, RangePlan,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{resolve_policy, DevicePolicy};

const SEARCH_KERNEL: &str = include_str!("../kernels/search.cl");
const ENTRY_POINT: &str = "string_search";

/// Number of words searched in one pass, each exactly this many bytes.
pub const WORD_COUNT: usize = 4;
pub const WORD_LEN: usize = 4;

/// Count occurrences of four 4-byte words in a text file on the device.
#[derive(Debug, Parser)]
pub struct SearchCommand {
    /// Text file to scan.
    #[arg(long, value_name = "PATH")]
    pub text: PathBuf,

    /// Four comma-separated words of exactly four bytes each.
    #[arg(
        long,
        value_name = "WORDS",
        default_value = "that,with,have,from",
        value_parser = parse_words
    )]
    pub words: WordTable,

    /// Device policy; defaults to gpu (no CPU fallback).
    #[arg(long, value_enum)]
    pub device: Option<DevicePolicy>,

    /// Kernel source file overriding the embedded kernel.
    #[arg(long, value_name = "PATH")]
    pub kernel: Option<PathBuf>,

    /// Enable queue profiling and log the kernel execution time.
    #[arg(long)]
    pub profile: bool,
}

impl SearchCommand {
    pub fn run(self) -> Result<()> {
        let corpus = load_corpus(&self.text)?;
        let counts = self.count_occurrences(&corpus)?;
        println!();
        println!("Results:");
        for (word, count) in self.words.words().iter().zip(counts) {
            println!("Number of occurrences of '{word}': {count}");
        }
        Ok(())
    }

    /// Full pipeline: select device, compile, partition the corpus, launch,
    /// read the four totals back.
    pub fn count_occurrences(&self, corpus: &[u8]) -> Result<[i32; WORD_COUNT]> {
        let policy = resolve_policy(self.device, DevicePolicy::Gpu)?;
        let ctx = DispatchContext::new(DispatchConfig {
            preference: policy.preference().to_vec(),
            profiling: self.profile,
            build_options: String::new(),
        })?;
        info!(
            device = %ctx.device_info().name,
            platform = %ctx.platform_name(),
            "selected compute device"
        );

        let source = match &self.kernel {
            Some(path) => ProgramSource::from_file(path)?,
            None => ProgramSource::from(SEARCH_KERNEL),
        };
        let program = CompiledProgram::build(&ctx, source)?;
        let kernel = KernelHandle::create(&program, ENTRY_POINT)?;

        let plan = RangePlan::for_device(ctx.device_info(), corpus.len())?;
        info!(
            global = plan.geometry.global(),
            local = ?plan.geometry.local(),
            bytes_per_item = plan.bytes_per_item,
            "partitioned corpus across the device"
        );
        let (chars_per_item, text_len) = range_args(&plan, corpus.len())?;

        let text_buffer = DeviceBuffer::from_slice(&ctx, AccessMode::ReadOnly, corpus)?;
        let count_seed = [0i32; WORD_COUNT];
        let count_buffer = DeviceBuffer::from_slice(&ctx, AccessMode::ReadWrite, &count_seed)?;

        kernel.bind_scalar(0, self.words.pattern())?;
        kernel.bind_buffer(1, &text_buffer)?;
        kernel.bind_scalar(2, &chars_per_item)?;
        kernel.bind_local(3, WORD_COUNT * std::mem::size_of::<i32>())?;
        kernel.bind_buffer(4, &count_buffer)?;
        kernel.bind_scalar(5, &text_len)?;

        let done = kernel.launch(ctx.queue(), plan.geometry)?;
        let counts = count_buffer.read_blocking(ctx.queue(), Some(&done))?;
        if let Some(ms) = done.elapsed_ms() {
            info!(elapsed_ms = ms, "kernel execution time");
        }

        Ok([counts[0], counts[1], counts[2], counts[3]])
    }
}

/// The four search words and their packed 16-byte device representation.
#[derive(Clone, Debug)]
pub struct WordTable {
    words: [String; WORD_COUNT],
    pattern: [u8; WORD_COUNT * WORD_LEN],
}

impl WordTable {
    pub fn words(&self) -> &[String; WORD_COUNT] {
        &self.words
    }

    /// The words packed back to back, as the kernel's char16 argument.
    pub fn pattern(&self) -> &[u8; WORD_COUNT * WORD_LEN] {
        &self.pattern
    }
}

impl std::str::FromStr for WordTable {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_words(raw)
    }
}

fn parse_words(raw: &str) -> Result<WordTable, String> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != WORD_COUNT {
        return Err(format!(
            "expected {WORD_COUNT} comma-separated words, got {}",
            parts.len()
        ));
    }
    let mut words: [String; WORD_COUNT] = Default::default();
    let mut pattern = [0u8; WORD_COUNT * WORD_LEN];
    for (i, part) in parts.iter().enumerate() {
        if part.len() != WORD_LEN {
            return Err(format!(
                "word `{part}` is {} byte(s); every word must be exactly {WORD_LEN} bytes",
                part.len()
            ));
        }
        pattern[i * WORD_LEN..(i + 1) * WORD_LEN].copy_from_slice(part.as_bytes());
        words[i] = part.to_string();
    }
    Ok(WordTable { words, pattern })
}

/// Kernel scalar arguments derived from the plan. The kernel walks its
/// windows with uint arithmetic, so a partition whose coverage extends past
/// `u32::MAX` would wrap the tail work-items back into the low addresses;
/// such plans are rejected before anything is bound.
fn range_args(plan: &RangePlan, corpus_len: usize) -> Result<(i32, u32)> {
    let chars_per_item = i32::try_from(plan.bytes_per_item)
        .context("per-item text share exceeds the kernel's int argument")?;
    let text_len =
        u32::try_from(corpus_len).context("text file exceeds the kernel's uint range")?;
    if plan.covered_bytes() > u32::MAX as usize {
        bail!(
            "partitioned coverage of {} bytes exceeds the kernel's uint range",
            plan.covered_bytes()
        );
    }
    Ok((chars_per_item, text_len))
}

/// Read the corpus, dropping a single trailing newline so the byte count
/// matches the visible text. An empty corpus cannot be partitioned.
fn load_corpus(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = fs::read(path)
        .with_context(|| format!("failed to read text file {}", path.display()))?;
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    if bytes.is_empty() {
        bail!("text file {} is empty", path.display());
    }
    Ok(bytes)
}
