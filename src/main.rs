use crate::shell::start_shell;

mod disk;
mod registry;
mod shell;
mod unit;

fn main() {
    start_shell();
}
