// src/analysis/rules/concurrency_c01_test.rs

use crate::analysis::rules::test_support::{check, lines_of};
use crate::types::{Finding, RuleId};

fn c01(src: &str) -> Vec<Finding> {
    check(RuleId::UnsynchronizedSharedState, src)
}

const FLAG_RACE: &str = "\
class Flag {
  std::mutex m;
  bool ready = false;
  void set() {
    std::lock_guard<std::mutex> g(m);
    ready = true;
  }
  void spawn() {
    std::thread t([this] {
      if (ready) {}
    });
    t.join();
  }
};";

#[test]
fn locked_write_and_threaded_read_cross_reference() {
    let findings = c01(FLAG_RACE);
    assert_eq!(lines_of(&findings), vec![6, 10]);
    let (write, read) = (&findings[0], &findings[1]);
    assert!(write.message.contains("written under `m`"));
    assert!(read.message.contains("read here without holding `m`"));
    assert_eq!(write.related[0].location, read.location);
    assert_eq!(read.related[0].location, write.location);
    assert_eq!(read.notes, vec!["this access runs on a spawned thread".to_string()]);
}

#[test]
fn threaded_access_elsewhere_exposes_the_bare_read() {
    let src = "\
class Flag {
  std::mutex m;
  bool ready = false;
  void set() {
    std::lock_guard<std::mutex> g(m);
    ready = true;
  }
  bool get() { return ready; }
  void spawn() {
    std::thread t([this] {
      std::lock_guard<std::mutex> g(m);
      if (ready) {}
    });
    t.join();
  }
};";
    let findings = c01(src);
    assert_eq!(lines_of(&findings), vec![6, 8, 12]);
    let bare = &findings[1];
    assert!(bare.message.contains("read here without holding `m`"));
    assert!(bare.notes.is_empty());
}

#[test]
fn lock_inside_thread_body_is_consistent() {
    let src = "\
class Flag {
  std::mutex m;
  bool ready = false;
  void set() {
    std::lock_guard<std::mutex> g(m);
    ready = true;
  }
  void spawn() {
    std::thread t([this] {
      std::lock_guard<std::mutex> g(m);
      if (ready) {}
    });
  }
};";
    assert!(c01(src).is_empty());
}

#[test]
fn no_thread_no_finding() {
    let src = "\
struct Counter {
  std::mutex m;
  int n = 0;
  void a() { std::lock_guard<std::mutex> g(m); n++; }
  void b() { n = 0; }
};";
    assert!(c01(src).is_empty());
}

#[test]
fn atomics_are_never_reported() {
    let src = "\
class Flag {
  std::mutex m;
  std::atomic<bool> ready{false};
  void set() { std::lock_guard<std::mutex> g(m); ready = true; }
  void spawn() { std::thread t([this] { if (ready) {} }); }
};";
    assert!(c01(src).is_empty());
}

#[test]
fn reads_alone_do_not_race() {
    let src = "\
class Cfg {
  std::mutex m;
  int limit;
  int get() { std::lock_guard<std::mutex> g(m); return limit; }
  void spawn() { std::thread t([this] { use(limit); }); }
};";
    assert!(c01(src).is_empty());
}

#[test]
fn thread_entry_method_counts_as_threaded() {
    let src = "\
class Pump {
  std::mutex m;
  int level = 0;
  void run() { level++; }
  void start() { std::thread t(&Pump::run, this); }
  int read() { std::lock_guard<std::mutex> g(m); return level; }
};";
    assert_eq!(lines_of(&c01(src)), vec![4, 6]);
}

#[test]
fn out_of_line_methods_of_undeclared_class() {
    let src = "\
void Server::start() {
    std::lock_guard<std::mutex> lock(m_mutex);
    m_running = true;
    for (int i = 0; i < 4; i++) {
        m_workers.emplace_back([this]() {
            while (m_running) {}
        });
    }
}

void Server::stop() {
    m_running = false;
    for (auto& t : m_workers) { t.join(); }
}";
    let findings = c01(src);
    assert_eq!(lines_of(&findings), vec![3, 6, 12]);
    assert!(findings.iter().all(|f| f.message.contains("Server::m_running")));
    assert_eq!(findings[0].related.len(), 2);
}
