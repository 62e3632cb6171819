use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

const NOTICE: &str = "Shell: Background process finished";

struct Session {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<String>,
    errors: Receiver<String>,
    seen: Vec<String>,
}

fn forward_lines(stream: impl Read + Send + 'static) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

impl Session {
    fn start() -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_job_shell"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to start the shell");

        let lines = forward_lines(child.stdout.take().unwrap());
        let errors = forward_lines(child.stderr.take().unwrap());
        let stdin = child.stdin.take();
        let mut session = Session {
            child,
            stdin,
            lines,
            errors,
            seen: Vec::new(),
        };
        // the signal listener is running once a command has been executed
        session.send("echo ready");
        session.expect_line("ready");
        session
    }

    fn pid(&self) -> Pid {
        Pid::from_raw(self.child.id() as i32)
    }

    fn send(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("stdin already closed");
        writeln!(stdin, "{}", line).unwrap();
        stdin.flush().unwrap();
    }

    fn close_stdin(&mut self) {
        self.stdin.take();
    }

    fn expect_line(&mut self, needle: &str) {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(left) {
                Ok(line) => {
                    let found = line.contains(needle);
                    self.seen.push(line);
                    if found {
                        return;
                    }
                }
                Err(_) => panic!("no line containing {:?}, saw {:?}", needle, self.seen),
            }
        }
    }

    fn expect_error(&mut self, needle: &str) {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut errors = Vec::new();
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.errors.recv_timeout(left) {
                Ok(line) if line.contains(needle) => return,
                Ok(line) => errors.push(line),
                Err(_) => panic!("no stderr line containing {:?}, saw {:?}", needle, errors),
            }
        }
    }

    fn wait(&mut self, limit: Duration) -> ExitStatus {
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = self.child.try_wait().unwrap() {
                return status;
            }
            if Instant::now() > deadline {
                let _ = self.child.kill();
                panic!("shell did not exit within {:?}", limit);
            }
            thread::sleep(Duration::from_millis(20));
        }
    }

    /// All output lines, including those produced after the shell exited.
    fn output(mut self) -> Vec<String> {
        self.seen.extend(self.lines.iter());
        self.seen
    }
}

fn notices(lines: &[String]) -> usize {
    lines.iter().filter(|l| l.contains(NOTICE)).count()
}

#[test]
fn exit_terminates_background_jobs_and_waits_for_them() {
    let mut sh = Session::start();
    let started = Instant::now();
    sh.send("sleep 30 &");
    sh.send("sleep 30 &");
    sh.send("exit");

    let status = sh.wait(Duration::from_secs(15));
    assert!(status.success(), "shell exited with {:?}", status);
    assert!(started.elapsed() < Duration::from_secs(15));
    assert_eq!(notices(&sh.output()), 2);
}

#[test]
fn end_of_input_behaves_like_exit() {
    let mut sh = Session::start();
    sh.send("sleep 30 &");
    sh.close_stdin();

    let status = sh.wait(Duration::from_secs(15));
    assert!(status.success());
    assert_eq!(notices(&sh.output()), 1);
}

#[test]
fn finished_background_job_is_announced_without_further_input() {
    let mut sh = Session::start();
    sh.send("true &");
    sh.expect_line(NOTICE);

    sh.send("exit");
    assert!(sh.wait(Duration::from_secs(10)).success());
    assert_eq!(notices(&sh.output()), 1);
}

#[test]
fn interrupt_while_idle_keeps_the_shell_running() {
    let mut sh = Session::start();
    kill(sh.pid(), Signal::SIGINT).unwrap();
    thread::sleep(Duration::from_millis(300));
    assert!(sh.child.try_wait().unwrap().is_none(), "shell died on SIGINT");

    sh.send("echo still-here");
    sh.expect_line("still-here");
    sh.send("exit");
    assert!(sh.wait(Duration::from_secs(10)).success());
}

#[test]
fn interrupt_terminates_the_foreground_command() {
    let mut sh = Session::start();
    let started = Instant::now();
    sh.send("sleep 30");
    // a builtin runs in-process, so the forwarded SIGTERM cannot hit it
    sh.send("cd a b");

    // idle interrupts are no-ops, so keep interrupting until the sleep is gone
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        kill(sh.pid(), Signal::SIGINT).unwrap();
        match sh.lines.recv_timeout(Duration::from_millis(200)) {
            Ok(line) => {
                let done = line.contains("cd: too many arguments");
                sh.seen.push(line);
                if done {
                    break;
                }
            }
            Err(_) => assert!(Instant::now() < deadline, "foreground command kept running"),
        }
    }
    assert!(started.elapsed() < Duration::from_secs(15));

    sh.send("exit");
    assert!(sh.wait(Duration::from_secs(10)).success());
}

#[test]
fn cd_errors_are_reported_and_the_shell_continues() {
    let mut sh = Session::start();
    sh.send("cd a b");
    sh.expect_line("cd: too many arguments");
    sh.send("no-such-command-8421");
    sh.expect_error("no-such-command-8421: command not found");
    sh.send("exit");
    assert!(sh.wait(Duration::from_secs(10)).success());
    assert!(
        sh.output().iter().all(|l| !l.contains("command not found")),
        "launch failure leaked to stdout"
    );
}
