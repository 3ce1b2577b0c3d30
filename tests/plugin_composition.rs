//! Plugin ordering, hook fan-out and failure isolation through `Loader::load`.

use daq_loader::plugin::PluginDescriptor;
use daq_loader::prelude::*;
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

type Journal = Rc<RefCell<Vec<String>>>;

#[derive(Clone, Copy, PartialEq)]
enum Fault {
    None,
    Construct,
    Produce,
    Panic,
    Hook,
}

/// Produces one object per name in its payload and journals every hook call
/// as `observer<-source:name`.
struct Recorder {
    source: String,
    names: Vec<String>,
    fault: Fault,
    journal: Journal,
}

impl Plugin for Recorder {
    fn get_objects(&mut self, _resolver: &Resolver<'_>) -> LoadResult<ObjectGroup> {
        match self.fault {
            Fault::Produce => return Err(anyhow::anyhow!("device offline").into()),
            Fault::Panic => panic!("{} blew up", self.source),
            _ => {}
        }
        Ok(self
            .names
            .iter()
            .map(|n| (n.clone(), Object::new(format!("{}:{}", self.source, n))))
            .collect())
    }

    fn future_plugin_hook(&mut self, source: &str, objs: &ObjectGroup) -> LoadResult<()> {
        if self.fault == Fault::Hook {
            return Err(anyhow::anyhow!("hook refused").into());
        }
        for name in objs.keys() {
            self.journal
                .borrow_mut()
                .push(format!("{}<-{}:{}", self.source, source, name));
        }
        Ok(())
    }
}

fn register_recorder(
    plugins: &mut PluginRegistry,
    source: &str,
    priority: i32,
    fault: Fault,
    journal: &Journal,
) {
    let journal = Rc::clone(journal);
    let owner = source.to_string();
    plugins.insert(
        source,
        PluginDescriptor::from_fn(priority, "Recorder", move |info: Info| {
            if fault == Fault::Construct {
                return Err(LoadError::Validation("bad payload".into()));
            }
            Ok(Box::new(Recorder {
                source: owner.clone(),
                names: info.string_list()?,
                fault,
                journal: Rc::clone(&journal),
            }) as Box<dyn Plugin>)
        }),
    );
}

fn text<'a>(ns: &'a Namespace, name: &str) -> Option<&'a str> {
    ns.get(name)
        .and_then(|o| o.downcast_ref::<String>())
        .map(String::as_str)
}

#[test]
fn hooks_only_flow_to_earlier_plugins() {
    let journal = Journal::default();
    let mut plugins = PluginRegistry::new();
    register_recorder(&mut plugins, "a", 10, Fault::None, &journal);
    register_recorder(&mut plugins, "b", 1, Fault::None, &journal);
    register_recorder(&mut plugins, "c", 1, Fault::None, &journal);
    let modules = ModuleRegistry::new();
    let loader = Loader::new(plugins, &modules);

    let session = loader.load_yaml("c: [z]\nb: [y1, y2]\na: [x]\n").unwrap();

    assert_eq!(session.built, vec!["a", "c", "b"]);
    assert_eq!(
        journal.borrow().as_slice(),
        ["a<-c:z", "a<-b:y1", "a<-b:y2", "c<-b:y1", "c<-b:y2"]
    );
    assert_eq!(
        session.objects.names().collect::<Vec<_>>(),
        vec!["x", "y1", "y2", "z"]
    );
    assert_eq!(text(&session.objects, "y2"), Some("b:y2"));
    assert_eq!(session.groups["c"].names().collect::<Vec<_>>(), vec!["z"]);
}

#[test]
fn ties_keep_declaration_order() {
    let journal = Journal::default();
    let mut plugins = PluginRegistry::new();
    for source in ["p", "q", "r"] {
        register_recorder(&mut plugins, source, 5, Fault::None, &journal);
    }
    let modules = ModuleRegistry::new();
    let loader = Loader::new(plugins, &modules);

    let session = loader.load_yaml("r: [r1]\np: [p1]\nq: [q1]\n").unwrap();
    assert_eq!(session.built, vec!["r", "p", "q"]);
}

#[test]
fn every_plugin_failing_leaves_an_empty_namespace() {
    let journal = Journal::default();
    let mut plugins = PluginRegistry::new();
    register_recorder(&mut plugins, "construct", 3, Fault::Construct, &journal);
    register_recorder(&mut plugins, "produce", 2, Fault::Produce, &journal);
    register_recorder(&mut plugins, "panic", 1, Fault::Panic, &journal);
    let modules = ModuleRegistry::new();
    let loader = Loader::new(plugins, &modules);

    let session = loader
        .load_yaml("construct: [a]\nproduce: [b]\npanic: [c]\n")
        .unwrap();

    assert!(session.objects.is_empty());
    assert!(session.built.is_empty());
    assert_eq!(session.failed, vec!["construct", "produce", "panic"]);
    assert!(journal.borrow().is_empty());
}

#[test]
fn failed_plugin_is_not_an_observer() {
    let journal = Journal::default();
    let mut plugins = PluginRegistry::new();
    register_recorder(&mut plugins, "broken", 5, Fault::Produce, &journal);
    register_recorder(&mut plugins, "ok", 0, Fault::None, &journal);
    let modules = ModuleRegistry::new();
    let loader = Loader::new(plugins, &modules);

    let session = loader.load_yaml("broken: [a]\nok: [b]\n").unwrap();

    assert_eq!(session.failed, vec!["broken"]);
    assert_eq!(session.objects.names().collect::<Vec<_>>(), vec!["b"]);
    assert!(journal.borrow().is_empty());
}

#[test]
fn hook_failure_does_not_stop_other_observers() {
    let journal = Journal::default();
    let mut plugins = PluginRegistry::new();
    register_recorder(&mut plugins, "grumpy", 9, Fault::Hook, &journal);
    register_recorder(&mut plugins, "watcher", 8, Fault::None, &journal);
    register_recorder(&mut plugins, "late", 0, Fault::None, &journal);
    let modules = ModuleRegistry::new();
    let loader = Loader::new(plugins, &modules);

    let session = loader
        .load_yaml("grumpy: [g]\nwatcher: [w]\nlate: [l]\n")
        .unwrap();

    assert_eq!(session.built, vec!["grumpy", "watcher", "late"]);
    assert_eq!(*journal.borrow(), vec!["watcher<-late:l".to_string()]);
    assert_eq!(session.objects.len(), 3);
}

#[test]
fn unknown_sections_are_skipped() {
    let modules = ModuleRegistry::new();
    let loader = Loader::new(PluginRegistry::with_builtins(), &modules);

    let session = loader.load_yaml("mystery: [a]\nload: []\n").unwrap();
    assert_eq!(session.skipped, vec!["mystery"]);
    assert_eq!(session.built, vec!["load"]);
    assert!(session.objects.is_empty());
}

#[test]
fn collisions_follow_the_policy() {
    let yaml = "first: [shared, a]\nsecond: [shared, b]\n";
    let build = |policy| {
        let journal = Journal::default();
        let mut plugins = PluginRegistry::new();
        register_recorder(&mut plugins, "first", 0, Fault::None, &journal);
        register_recorder(&mut plugins, "second", 0, Fault::None, &journal);
        (plugins, policy, journal)
    };
    let modules = ModuleRegistry::new();

    let (plugins, policy, journal) = build(CollisionPolicy::Replace);
    let session = Loader::new(plugins, &modules)
        .with_collision_policy(policy)
        .load_yaml(yaml)
        .unwrap();
    assert_eq!(text(&session.objects, "shared"), Some("second:shared"));
    assert_eq!(session.collisions.len(), 1);
    assert!(session.collisions[0].replaced);
    assert_eq!(
        *journal.borrow(),
        vec!["first<-second:shared".to_string(), "first<-second:b".to_string()]
    );

    let (plugins, policy, journal) = build(CollisionPolicy::Reject);
    let session = Loader::new(plugins, &modules)
        .with_collision_policy(policy)
        .load_yaml(yaml)
        .unwrap();
    assert_eq!(text(&session.objects, "shared"), Some("first:shared"));
    assert!(!session.collisions[0].replaced);
    assert_eq!(*journal.borrow(), vec!["first<-second:b".to_string()]);
    assert_eq!(session.groups["second"].names().collect::<Vec<_>>(), vec!["b"]);
}
