use super::*;
use crate::syntax::parse_source;

fn table(src: &str) -> (crate::syntax::Parsed, SymbolTable) {
    let parsed = parse_source(src);
    let table = SymbolTable::build(&parsed.tree);
    (parsed, table)
}

fn name_node(tree: &SyntaxTree, name: &str, nth: usize) -> Option<NodeId> {
    tree.walk()
        .filter(|&id| matches!(tree.kind(id), NodeKind::Name(n) if n.name == name))
        .nth(nth)
}

#[test]
fn locals_parameters_and_members() {
    let src = "struct Counter {\n  int total;\n  void add(int n) { int step = n; total += step; }\n};";
    let (parsed, table) = table(src);
    let tree = &parsed.tree;
    let storage: Vec<(&str, Storage)> = table.declarations().map(|d| (d.name.as_str(), d.storage)).collect();
    assert_eq!(
        storage,
        vec![("total", Storage::Member), ("n", Storage::Parameter), ("step", Storage::Local)]
    );
    let use_of_total = name_node(tree, "total", 0).expect("total is referenced");
    assert!(matches!(
        table.resolve(tree, "total", use_of_total, false),
        Resolved::Decl(d) if d.storage == Storage::Member
    ));
    let class = table.class("Counter").expect("class recorded");
    assert!(class.declared);
    assert!(class.fields.contains_key("total"));
    assert!(class.methods.contains_key("add"));
}

#[test]
fn lambda_without_capture_cannot_see_locals() {
    let src = "void f() {\n  int x = 1;\n  auto a = [&]() { return x; };\n  auto b = []() { return x; };\n}";
    let (parsed, table) = table(src);
    let tree = &parsed.tree;
    let in_a = name_node(tree, "x", 0).expect("first use");
    let in_b = name_node(tree, "x", 1).expect("second use");
    assert!(matches!(table.resolve(tree, "x", in_a, false), Resolved::Decl(_)));
    assert!(matches!(table.resolve(tree, "x", in_b, false), Resolved::Unresolved));
}

#[test]
fn later_local_is_not_visible_earlier() {
    let src = "void f() {\n  use(v);\n  int v = 2;\n}";
    let (parsed, table) = table(src);
    let tree = &parsed.tree;
    let early = name_node(tree, "v", 0).expect("use before declaration");
    assert!(matches!(table.resolve(tree, "v", early, false), Resolved::Unresolved));
}

#[test]
fn out_of_line_method_presumes_members() {
    let src = "void Server::stop() {\n  m_running = false;\n  helper();\n  MAX_LEN;\n}";
    let (parsed, table) = table(src);
    let tree = &parsed.tree;
    let running = name_node(tree, "m_running", 0).expect("member use");
    assert!(matches!(
        table.resolve(tree, "m_running", running, false),
        Resolved::PresumedMember { class: "Server" }
    ));
    let helper = name_node(tree, "helper", 0).expect("call");
    assert!(matches!(table.resolve(tree, "helper", helper, true), Resolved::Unresolved));
    let constant = name_node(tree, "MAX_LEN", 0).expect("macro use");
    assert!(matches!(table.resolve(tree, "MAX_LEN", constant, false), Resolved::Unresolved));
    assert!(!table.class("Server").is_some_and(|c| c.declared));
}

#[test]
fn new_marks_pointer_as_owning() {
    let src = "void f() {\n  int* a = new int(1);\n  int* b = nullptr;\n  int* c;\n  c = new int[4];\n}";
    let (_, table) = table(src);
    let owning = |name: &str| {
        table
            .declarations()
            .find(|d| d.name == name)
            .is_some_and(|d| d.ty.category == TypeCategory::Pointer { owning: true })
    };
    assert!(owning("a"));
    assert!(!owning("b"));
    assert!(owning("c"));
}

#[test]
fn thread_launches_are_detected() {
    let src = "struct W {\n  std::vector<std::thread> pool;\n  void go() {\n    std::thread t([this] { run(); });\n    pool.emplace_back([this] {});\n    auto f = [this] {};\n  }\n  void run() {}\n};";
    let (parsed, table) = table(src);
    let tree = &parsed.tree;
    let lambdas: Vec<NodeId> = tree.walk().filter(|&id| matches!(tree.kind(id), NodeKind::Lambda(_))).collect();
    assert_eq!(lambdas.len(), 3);
    assert!(table.is_launched(lambdas[0]));
    assert!(table.is_launched(lambdas[1]));
    assert!(!table.is_launched(lambdas[2]));
    let class = table.class("W").expect("class recorded");
    assert!(class.thread_reachable().contains("run"));
    assert!(!class.thread_reachable().contains("go"));
}

#[test]
fn method_pointer_thread_entry() {
    let src = "class Pump {\n  int level;\n  void loop() { level++; }\n  void start() { std::thread t(&Pump::loop, this); }\n};";
    let (_, table) = table(src);
    let class = table.class("Pump").expect("class recorded");
    assert!(class.methods.get("loop").is_some_and(|m| m.thread_entry));
    let site = table.accesses().iter().find(|s| s.member == "level").expect("level access");
    assert!(site.thread_context);
    assert!(site.is_write);
}

#[test]
fn lock_guard_extent_covers_rest_of_block() {
    let src = "struct S {\n  std::mutex mu;\n  int a;\n  void f() {\n    a = 1;\n    {\n      std::lock_guard<std::mutex> g(mu);\n      a = 2;\n    }\n    a = 3;\n  }\n};";
    let (_, table) = table(src);
    let locks: Vec<Option<&str>> = table
        .accesses()
        .iter()
        .filter(|s| s.member == "a")
        .map(|s| s.lock.as_deref())
        .collect();
    assert_eq!(locks, vec![None, Some("mu"), None]);
    assert!(table.is_lock_name("mu"));
    assert_eq!(table.inconsistent_members("S"), vec!["a"]);
    assert_eq!(table.protecting_locks("S", "a").collect::<Vec<_>>(), vec!["mu"]);
}

#[test]
fn explicit_lock_and_unlock() {
    let src = "struct S {\n  std::mutex m;\n  int n;\n  void f() {\n    m.lock();\n    n = 1;\n    m.unlock();\n    n = 2;\n  }\n};";
    let (_, table) = table(src);
    let locks: Vec<Option<&str>> =
        table.accesses().iter().filter(|s| s.member == "n").map(|s| s.lock.as_deref()).collect();
    assert_eq!(locks, vec![Some("m"), None]);
}

#[test]
fn deferred_guard_locks_later() {
    let src = "struct S {\n  std::mutex m;\n  int n;\n  void f() {\n    std::unique_lock<std::mutex> lk(m, std::defer_lock);\n    n = 1;\n    lk.lock();\n    n = 2;\n    lk.unlock();\n    n = 3;\n  }\n};";
    let (_, table) = table(src);
    let locks: Vec<Option<&str>> =
        table.accesses().iter().filter(|s| s.member == "n").map(|s| s.lock.as_deref()).collect();
    assert_eq!(locks, vec![None, Some("m"), None]);
}

#[test]
fn launched_lambda_starts_unlocked() {
    let src = "void Server::start() {\n  std::lock_guard<std::mutex> lock(m_mutex);\n  m_running = true;\n  m_workers.emplace_back([this]() {\n    while (m_running) {}\n  });\n}";
    let (_, table) = table(src);
    let sites: Vec<(&str, Option<&str>, bool)> = table
        .accesses()
        .iter()
        .filter(|s| s.member == "m_running")
        .map(|s| (s.member.as_str(), s.lock.as_deref(), s.thread_context))
        .collect();
    assert_eq!(sites, vec![("m_running", Some("m_mutex"), false), ("m_running", None, true)]);
}

#[test]
fn constructor_bodies_are_not_shared() {
    let src = "struct S {\n  int n;\n  S() { n = 0; }\n  ~S() { n = 1; }\n  void f() { n = 2; }\n};";
    let (_, table) = table(src);
    assert_eq!(table.accesses().len(), 1);
}

#[test]
fn structured_bindings_declare_each_name() {
    let src = "void f(std::map<int, int>& m) {\n  for (auto& [k, v] : m) { use(k, v); }\n}";
    let (_, table) = table(src);
    let names: Vec<&str> = table.declarations().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["m", "k", "v"]);
}
