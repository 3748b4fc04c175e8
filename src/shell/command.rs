use colored::*;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;

use crate::registry::DiskRegistry;
use crate::unit::{error::DiskError, DiskUnit};

/// 命令集是一个封闭的枚举，统一走 match 分发。
#[derive(Debug)]
pub enum Command {
    Help,
    ShowDisks,
    CreateDisk(String, Option<(u32, u32)>),
    DeleteDisk(String),
    Mount(String),
    Unmount,
    DParams,
    Format,
    ReadBlock(u32),
    WriteBlock(u32, String),
    AllocBlock,
    FreeBlock(u32),
    AllocINode,
    Exit,
}

/// shell 的活动状态：名字登记表 + 当前挂载的盘（至多一块）。
#[derive(Debug)]
pub struct ShellState {
    pub registry: DiskRegistry,
    pub mounted: Option<(String, DiskUnit)>,
}

pub fn execute_command(cmd: &Command, state: &mut ShellState) -> Result<(), Box<dyn Error>> {
    match cmd {
        Command::Help => print_help(),
        Command::ShowDisks => {
            if state.registry.names().is_empty() {
                println!("{}", "No disks to show.".bright_black());
            } else {
                println!("{}", "Existing disks:".bright_cyan());
                for name in state.registry.names() {
                    let mounted = matches!(&state.mounted, Some((m, _)) if m == name);
                    if mounted {
                        println!("  💿 {} {}", name.green().bold(), "(mounted)".bright_black());
                    } else {
                        println!("  💿 {}", name);
                    }
                }
            }
        }
        Command::CreateDisk(name, geometry) => {
            if state.registry.contains(name) {
                return Err(Box::new(DiskError::ExistingDisk(name.clone())));
            }

            let path = state.registry.disk_path(name);
            match geometry {
                Some((capacity, block_size)) => DiskUnit::create(&path, *capacity, *block_size)?,
                None => DiskUnit::create_default(&path)?,
            }
            state.registry.add(name)?;
            println!("✅ Created disk: {}", name.green());
        }
        Command::DeleteDisk(name) => {
            if matches!(&state.mounted, Some((m, _)) if m == name) {
                println!(
                    "{}",
                    "Disk is mounted. To delete, unmount first.".yellow()
                );
                return Ok(());
            }
            if !state.registry.contains(name) {
                return Err(Box::new(DiskError::NonExistingDisk(name.clone())));
            }

            let confirmed = Confirm::new()
                .with_prompt(format!("Delete disk '{}' and all its contents?", name))
                .default(false)
                .interact()?;
            if !confirmed {
                println!("{}", "Aborted.".bright_black());
                return Ok(());
            }

            std::fs::remove_file(state.registry.disk_path(name))?;
            state.registry.remove(name)?;
            println!("🗑️  Deleted disk: {}", name.red());
        }
        Command::Mount(name) => {
            if let Some((mounted, _)) = &state.mounted {
                if mounted == name {
                    println!("{}", "Disk already mounted.".yellow());
                } else {
                    println!(
                        "{} {}",
                        "Another disk is mounted:".yellow(),
                        mounted.bold()
                    );
                }
                return Ok(());
            }
            if !state.registry.contains(name) {
                return Err(Box::new(DiskError::NonExistingDisk(name.clone())));
            }

            let unit = DiskUnit::mount(&state.registry.disk_path(name))?;
            state.mounted = Some((name.clone(), unit));
            println!("💿 Mounted {}", name.green().bold());
        }
        Command::Unmount => match state.mounted.take() {
            Some((name, unit)) => {
                unit.shutdown();
                println!("⏏️  Unmounted {}", name.green());
            }
            None => return Err(Box::new(DiskError::NotMounted)),
        },
        Command::DParams => {
            let (name, unit) = mounted(state)?;
            println!("{}", format!("📊 Disk parameters: {}", name).bright_yellow().bold());
            println!("{}: {}", "Number of blocks".blue(), unit.capacity());
            println!("{}: {} bytes", "Block size".blue(), unit.block_size());
            println!("{}: {}", "Free blocks root".blue(), unit.first_free_block());
            println!(
                "{}: {}",
                "Index at free block root".blue(),
                unit.first_free_block_index()
            );
            println!(
                "{}: {}",
                "First free i-node at byte".blue(),
                unit.first_free_inode_offset()
            );
            println!("{}: {}", "Number of i-nodes".blue(), unit.number_of_inodes());
            println!(
                "{}: {} free / {} taken",
                "I-node usage".blue(),
                unit.free_inodes(),
                unit.taken_inodes()
            );
        }
        Command::Format => {
            let name = mounted(state)?.0.to_string();
            let confirmed = Confirm::new()
                .with_prompt(format!("Zero the whole data region of '{}'?", name))
                .default(false)
                .interact()?;
            if !confirmed {
                println!("{}", "Aborted.".bright_black());
                return Ok(());
            }

            let (_, unit) = mounted(state)?;
            let total = unit.capacity() - unit.first_data_block();
            println!("💾 Formatting data region ({} blocks)...", total);

            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::with_template("[{bar:40.green/black}] {pos:>4}/{len} {msg}")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            unit.low_level_format_with(|done, _| pb.set_position(done as u64))?;
            pb.finish_with_message("✅ Disk formatted!");
        }
        Command::ReadBlock(block_num) => {
            let (_, unit) = mounted(state)?;
            let mut buf = vec![0u8; unit.block_size() as usize];
            unit.read(*block_num, &mut buf)?;

            println!("📖 Block {}:", block_num.to_string().cyan());
            print_hex_dump(&buf);
        }
        Command::WriteBlock(block_num, text) => {
            let (_, unit) = mounted(state)?;
            // 文本截断/补零到正好一块
            let mut buf = vec![0u8; unit.block_size() as usize];
            let n = text.len().min(buf.len());
            buf[..n].copy_from_slice(&text.as_bytes()[..n]);

            unit.write(*block_num, &buf)?;
            println!("✏️  Wrote {} bytes into block {}", n, block_num.to_string().cyan());
        }
        Command::AllocBlock => {
            let (_, unit) = mounted(state)?;
            let bn = unit.get_free_block_number()?;
            println!("📦 Allocated block {}", bn.to_string().green());
        }
        Command::FreeBlock(bn) => {
            let (_, unit) = mounted(state)?;
            unit.register_free_block(*bn)?;
            println!("♻️  Block {} returned to the free list", bn.to_string().green());
        }
        Command::AllocINode => {
            let (_, unit) = mounted(state)?;
            let offset = unit.get_free_inode()?;
            println!("🏷️  Allocated i-node at byte offset {}", offset.to_string().green());
        }
        Command::Exit => {
            if let Some((name, unit)) = state.mounted.take() {
                unit.shutdown();
                println!("⏏️  Unmounted {}", name.green());
            }
            println!("{}", "👋 Shutting down...".yellow().bold());
        }
    }

    Ok(())
}

/// 取当前挂载的盘，没挂载就报 NotMounted。
fn mounted(state: &mut ShellState) -> Result<(&str, &mut DiskUnit), DiskError> {
    match &mut state.mounted {
        Some((name, unit)) => Ok((name.as_str(), unit)),
        None => Err(DiskError::NotMounted),
    }
}

fn print_hex_dump(buf: &[u8]) {
    for (row, chunk) in buf.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if (0x20..0x7f).contains(&b) {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        println!(
            "  {:>6}  {}  {}",
            format!("{:04x}", row * 16).bright_black(),
            hex.join(" "),
            ascii.bright_black()
        );
    }
}

fn print_help() {
    println!("{}", "📘 VDisk Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  showdisks                      List all created disks
  createdisk <name> [cap bsize]  Create a disk (defaults: 256 blocks x 32 bytes)
  deletedisk <name>              Delete a disk and unregister its name
  mount <name>                   Power on a disk
  unmount                        Power off the mounted disk
  dparams                        Show geometry and allocator state
  format                         Zero-fill the data region (low-level format)
  readblock <n>                  Hex dump of block n
  writeblock <n> <text>          Write text (zero padded) into block n
  allocblock                     Pop a block from the free list
  freeblock <n>                  Push block n back onto the free list
  allocinode                     Allocate an i-node from the pool
  help                           Show this help message
  exit                           Quit the shell
"
        .bright_black()
    );
}
