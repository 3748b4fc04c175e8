use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.trim().split_ascii_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let cmd = tokens[0];
    let args = &tokens[1..];

    match cmd {
        "help" => Some(Command::Help),
        "showdisks" => Some(Command::ShowDisks),
        "createdisk" => {
            let name = args.first()?.to_string();
            match args.len() {
                1 => Some(Command::CreateDisk(name, None)),
                3 => {
                    // 几何参数必须是非负整数，负数在这里就挡掉
                    let capacity = args[1].parse().ok()?;
                    let block_size = args[2].parse().ok()?;
                    Some(Command::CreateDisk(name, Some((capacity, block_size))))
                }
                _ => None,
            }
        }
        "deletedisk" => args.first().map(|&n| Command::DeleteDisk(n.to_string())),
        "mount" => args.first().map(|&n| Command::Mount(n.to_string())),
        "unmount" => Some(Command::Unmount),
        "dparams" => Some(Command::DParams),
        "format" => Some(Command::Format),
        "readblock" => args.first()?.parse().ok().map(Command::ReadBlock),
        "writeblock" => {
            if args.len() >= 2 {
                Some(Command::WriteBlock(
                    args[0].parse().ok()?,
                    args[1..].join(" "),
                ))
            } else {
                None
            }
        }
        "allocblock" => Some(Command::AllocBlock),
        "freeblock" => args.first()?.parse().ok().map(Command::FreeBlock),
        "allocinode" => Some(Command::AllocINode),
        "exit" => Some(Command::Exit),
        _ => None,
    }
}
