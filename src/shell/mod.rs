pub mod command;
pub mod parse;

use crate::registry::DiskRegistry;
use crate::shell::{
    command::{execute_command, Command, ShellState},
    parse::parse_command,
};
use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};
use std::{io::stdout, path::Path, path::PathBuf, thread, time::Duration};

/// 磁盘镜像和名字登记文件所在目录
const UNITS_DIR: &str = "disk-units";

pub fn start_shell() {
    boot_animation();

    let registry = match DiskRegistry::open(Path::new(UNITS_DIR)) {
        Ok(r) => r,
        Err(e) => {
            println!("{} {}", "❌ Cannot open disk directory:".red().bold(), e);
            return;
        }
    };
    let mut state = ShellState {
        registry,
        mounted: None,
    };

    let username = whoami::username();
    let hostname = whoami::hostname();

    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    // 初始化 reedline
    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vdisk_history");

    let mut line_editor = Reedline::create().with_history(Box::new(
        reedline::FileBackedHistory::with_file(100, history_path.clone()).unwrap(),
    ));

    // 命令补全
    let commands = vec![
        "help",
        "showdisks",
        "createdisk",
        "deletedisk",
        "mount",
        "unmount",
        "dparams",
        "format",
        "readblock",
        "writeblock",
        "allocblock",
        "freeblock",
        "allocinode",
        "exit",
    ];
    let completer = reedline::DefaultCompleter::new_with_wordlen(
        commands.iter().map(|s| s.to_string()).collect(),
        2,
    );
    line_editor = line_editor.with_completer(Box::new(completer));

    loop {
        // 提示符每轮重建，左段带上当前挂载的盘
        let mounted_name = state
            .mounted
            .as_ref()
            .map(|(n, _)| n.as_str())
            .unwrap_or("-");
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic(prompt_left(&username, &hostname, mounted_name)),
            DefaultPromptSegment::Basic("VDisk".to_string()),
        );

        let input = line_editor.read_line(&prompt);

        match input {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Some(cmd) => {
                        if let Err(e) = execute_command(&cmd, &mut state) {
                            println!("{} {}", "❌ Error:".red().bold(), e);
                        }
                        if matches!(cmd, Command::Exit) {
                            break;
                        }
                    }
                    None => println!(
                        "{}",
                        "⚠️  Unknown command. Type 'help' for command list.".yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                if let Some((_, unit)) = state.mounted.take() {
                    unit.shutdown();
                }
                println!("{}", "Exiting VDisk...".yellow());
                break;
            }
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    println!("{}", "GoodBye!".bright_yellow());
}

/// 提示符左段："user@host:挂载盘"。
/// 不带颜色转义码，reedline 要按可见宽度排版。
fn prompt_left(username: &str, hostname: &str, mounted_name: &str) -> String {
    format!("{}@{}:{}", username, hostname, mounted_name)
}

/// 动态欢迎动画
fn boot_animation() {
    let mut stdout = stdout();

    execute!(stdout, Clear(ClearType::All), cursor::MoveTo(0, 0)).unwrap();
    println!("{}", "[VDisk Booting...]".bright_yellow().bold());
    thread::sleep(Duration::from_millis(300));

    let steps = vec![
        "🧠 Initializing disk unit simulator...",
        "🗂️  Loading disk registry...",
        "📟 Loading shell...",
    ];

    for step in steps {
        println!("{}", step);
        thread::sleep(Duration::from_millis(400));
    }

    // 模拟进度条
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap()
            .progress_chars("=> "),
    );

    for i in 0..100 {
        pb.set_position(i);
        thread::sleep(Duration::from_millis(8));
    }
    pb.finish_with_message("✅ Ready!");

    thread::sleep(Duration::from_millis(300));
    execute!(
        stdout,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        Print("Welcome to VDisk v0.1.0\n"),
        ResetColor
    )
    .unwrap();
}
