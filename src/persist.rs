// used for persistence
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row, TransactionBehavior};
use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::trace;

use crate::dyadic::{DyadicEncoding, DyadicInterval, Fraction};
use crate::encoding::{Encoding, Predicate};
use crate::error::{NestsetError, Result};
use crate::interval::{Interval, IntervalEncoding, ROOT_LFT};
use crate::node::{Depth, Node, NodeId, TreeId};
use crate::store::{NodeStore, UnitOfWork};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

// ------------- Schema -------------
/// How an encoding's positions are laid out in an SQLite table.
///
/// The common columns `Node_Identity`, `Name`, `Tree_Identity` and `Depth`
/// come first, followed by [`Schema::POSITION_COLUMNS`].
pub trait Schema: Encoding {
    const TABLE: &'static str;
    const DEFINITION: &'static str;
    const POSITION_COLUMNS: &'static [&'static str];
    const ORDERING: &'static str;
    fn position_values(position: Option<&Self::Position>) -> Vec<Value>;
    fn position_from_row(row: &Row, first: usize) -> Result<Option<Self::Position>>;
    /// An SQL condition selecting at least every row `predicate` matches.
    fn filter(predicate: &Predicate<Self>) -> (String, Vec<Value>);
}

impl Schema for IntervalEncoding {
    const TABLE: &'static str = "IntervalNode";
    const DEFINITION: &'static str = "
        create table if not exists IntervalNode (
            Node_Identity integer not null,
            Name text not null,
            Tree_Identity integer null,
            Depth integer null,
            Lft integer null,
            Rgt integer null,
            constraint referenceable_IntervalNode_Identity primary key (
                Node_Identity
            )
        );
        create index if not exists IntervalNode_Tree_Lft on IntervalNode (
            Tree_Identity, Lft
        );
        create index if not exists IntervalNode_Tree_Rgt on IntervalNode (
            Tree_Identity, Rgt
        );
    ";
    const POSITION_COLUMNS: &'static [&'static str] = &["Lft", "Rgt"];
    const ORDERING: &'static str = "Lft, Depth";
    fn position_values(position: Option<&Interval>) -> Vec<Value> {
        match position {
            Some(p) => vec![Value::Integer(p.lft()), Value::Integer(p.rgt())],
            None => vec![Value::Null, Value::Null],
        }
    }
    fn position_from_row(row: &Row, first: usize) -> Result<Option<Interval>> {
        let lft: Option<i64> = row.get(first)?;
        let rgt: Option<i64> = row.get(first + 1)?;
        match (lft, rgt) {
            (Some(lft), Some(rgt)) => Interval::new(lft, rgt).map(Some).ok_or_else(|| {
                NestsetError::Invariant(format!("stored interval [{}, {}] is empty", lft, rgt))
            }),
            _ => Ok(None),
        }
    }
    fn filter(predicate: &Predicate<Self>) -> (String, Vec<Value>) {
        let int = Value::Integer;
        match predicate {
            Predicate::All => ("1 = 1".into(), vec![]),
            Predicate::LowerAbove(b) => ("Lft > ?".into(), vec![int(*b)]),
            Predicate::LowerAtLeast(b) => ("Lft >= ?".into(), vec![int(*b)]),
            Predicate::UpperAbove(b) => ("Rgt > ?".into(), vec![int(*b)]),
            Predicate::UpperEquals(b) => ("Rgt = ?".into(), vec![int(*b)]),
            Predicate::UpperBelow(b) => ("Rgt < ?".into(), vec![int(*b)]),
            Predicate::ContainedIn(p) => (
                "? <= Lft and Rgt <= ?".into(),
                vec![int(p.lft()), int(p.rgt())],
            ),
            Predicate::StrictlyInside(p, depth) => (
                "? < Lft and Rgt < ? and Depth > ?".into(),
                vec![int(p.lft()), int(p.rgt()), int(*depth)],
            ),
            Predicate::ChildrenOf(p, depth) => (
                "? < Lft and Rgt < ? and Depth = ?".into(),
                vec![int(p.lft()), int(p.rgt()), int(depth + 1)],
            ),
            Predicate::Enclosing(p, depth) => (
                "Lft < ? and ? < Rgt and Depth < ?".into(),
                vec![int(p.lft()), int(p.rgt()), int(*depth)],
            ),
            Predicate::Root => ("Lft = ?".into(), vec![int(ROOT_LFT)]),
        }
    }
}

// The Head and Tail columns hold the fractions rounded to the nearest double.
// Rounding is monotonic, so the non-strict comparisons below never lose a row
// that the exact predicate accepts; the exact test is applied afterwards.
impl Schema for DyadicEncoding {
    const TABLE: &'static str = "DyadicNode";
    const DEFINITION: &'static str = "
        create table if not exists DyadicNode (
            Node_Identity integer not null,
            Name text not null,
            Tree_Identity integer null,
            Depth integer null,
            HeadN integer null,
            HeadD integer null,
            TailN integer null,
            TailD integer null,
            Head real null,
            Tail real null,
            constraint referenceable_DyadicNode_Identity primary key (
                Node_Identity
            )
        );
        create index if not exists DyadicNode_Tree_Head on DyadicNode (
            Tree_Identity, Head
        );
    ";
    const POSITION_COLUMNS: &'static [&'static str] =
        &["HeadN", "HeadD", "TailN", "TailD", "Head", "Tail"];
    const ORDERING: &'static str = "Head, Depth";
    fn position_values(position: Option<&DyadicInterval>) -> Vec<Value> {
        match position {
            Some(p) => vec![
                Value::Integer(p.head().num()),
                Value::Integer(p.head().den()),
                Value::Integer(p.tail().num()),
                Value::Integer(p.tail().den()),
                Value::Real(p.head().to_f64()),
                Value::Real(p.tail().to_f64()),
            ],
            None => vec![Value::Null; 6],
        }
    }
    fn position_from_row(row: &Row, first: usize) -> Result<Option<DyadicInterval>> {
        let mut parts = [None; 4];
        for (i, part) in parts.iter_mut().enumerate() {
            *part = row.get::<_, Option<i64>>(first + i)?;
        }
        let [Some(head_n), Some(head_d), Some(tail_n), Some(tail_d)] = parts else {
            return Ok(None);
        };
        let fraction = |n, d| {
            Fraction::new(n, d).ok_or_else(|| {
                NestsetError::Invariant(format!("stored fraction {}/{} is not dyadic", n, d))
            })
        };
        let (head, tail) = (fraction(head_n, head_d)?, fraction(tail_n, tail_d)?);
        DyadicInterval::new(head, tail).map(Some).ok_or_else(|| {
            NestsetError::Invariant(format!("stored interval [{}, {}) is empty", head, tail))
        })
    }
    fn filter(predicate: &Predicate<Self>) -> (String, Vec<Value>) {
        let real = |f: &Fraction| Value::Real(f.to_f64());
        match predicate {
            Predicate::All => ("1 = 1".into(), vec![]),
            Predicate::LowerAbove(b) | Predicate::LowerAtLeast(b) => {
                ("Head >= ?".into(), vec![real(b)])
            }
            Predicate::UpperAbove(b) => ("Tail >= ?".into(), vec![real(b)]),
            Predicate::UpperEquals(b) => ("Tail = ?".into(), vec![real(b)]),
            Predicate::UpperBelow(b) => ("Tail <= ?".into(), vec![real(b)]),
            Predicate::ContainedIn(p) => (
                "? <= Head and Tail <= ?".into(),
                vec![real(&p.head()), real(&p.tail())],
            ),
            Predicate::StrictlyInside(p, depth) => (
                "? <= Head and Tail <= ? and Depth > ?".into(),
                vec![real(&p.head()), real(&p.tail()), Value::Integer(*depth)],
            ),
            Predicate::ChildrenOf(p, depth) => (
                "? <= Head and Tail <= ? and Depth = ?".into(),
                vec![real(&p.head()), real(&p.tail()), Value::Integer(depth + 1)],
            ),
            Predicate::Enclosing(p, depth) => (
                "Head <= ? and ? <= Tail and Depth < ?".into(),
                vec![real(&p.head()), real(&p.tail()), Value::Integer(*depth)],
            ),
            Predicate::Root => (
                "HeadN = 0 and TailN = 1 and TailD = 1".into(),
                vec![],
            ),
        }
    }
}

// ------------- Persistence -------------
/// SQLite-backed node store for one encoding.
///
/// Structural changes run in immediate transactions, which take the database
/// write lock before the first read. Two mutations of the same tree can
/// therefore never interleave between reading positions and writing the
/// positions derived from them.
pub struct Persistor<E: Schema> {
    connection: Mutex<Connection>,
    _encoding: PhantomData<E>,
}

impl<E: Schema> Persistor<E> {
    pub fn new(mode: PersistenceMode) -> Result<Self> {
        Self::with_busy_timeout(mode, Duration::from_millis(5000))
    }
    pub fn with_busy_timeout(mode: PersistenceMode, busy_timeout: Duration) -> Result<Self> {
        let connection = match &mode {
            PersistenceMode::InMemory => Connection::open_in_memory()?,
            PersistenceMode::File(path) => Connection::open(path)?,
        };
        connection.busy_timeout(busy_timeout)?;
        connection.execute_batch(E::DEFINITION)?;
        trace!(table = E::TABLE, ?mode, "schema ready");
        Ok(Self {
            connection: Mutex::new(connection),
            _encoding: PhantomData,
        })
    }
    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|e| NestsetError::Lock(e.to_string()))
    }
}

impl<E: Schema> NodeStore<E> for Persistor<E> {
    fn run_atomically<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn UnitOfWork<E>) -> Result<T>,
    {
        let mut connection = self.lock()?;
        let transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = work(&mut SqliteUnit::<E>::new(&transaction));
        match outcome {
            Ok(value) => {
                transaction.commit()?;
                Ok(value)
            }
            Err(e) => {
                transaction.rollback()?;
                Err(e)
            }
        }
    }
    fn read<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn UnitOfWork<E>) -> Result<T>,
    {
        let mut connection = self.lock()?;
        let transaction = connection.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let outcome = work(&mut SqliteUnit::<E>::new(&transaction));
        transaction.rollback()?;
        outcome
    }
}

// ------------- Unit of work -------------
struct SqliteUnit<'c, E: Schema> {
    connection: &'c Connection,
    _encoding: PhantomData<E>,
}

impl<'c, E: Schema> SqliteUnit<'c, E> {
    fn new(connection: &'c Connection) -> Self {
        Self {
            connection,
            _encoding: PhantomData,
        }
    }
    fn select() -> String {
        format!(
            "select Node_Identity, Name, Tree_Identity, Depth, {} from {}",
            E::POSITION_COLUMNS.join(", "),
            E::TABLE
        )
    }
    fn fetch(&self, sql: &str, values: &[Value]) -> Result<Vec<Node<E>>> {
        let mut statement = self.connection.prepare_cached(sql)?;
        let mut rows = statement.query(params_from_iter(values.iter()))?;
        let mut nodes = Vec::new();
        while let Some(row) = rows.next()? {
            nodes.push(read_node::<E>(row)?);
        }
        Ok(nodes)
    }
    fn record_values(node: &Node<E>) -> Vec<Value> {
        let mut values = vec![
            Value::Text(node.name().to_string()),
            node.tree_id().map_or(Value::Null, Value::Integer),
            node.depth().map_or(Value::Null, Value::Integer),
        ];
        values.extend(E::position_values(node.position()));
        values
    }
    fn expect_one(&self, changed: usize, node: &Node<E>) -> Result<()> {
        match changed {
            1 => Ok(()),
            _ => Err(NestsetError::Invariant(format!(
                "no record in {} for {}",
                E::TABLE,
                node
            ))),
        }
    }
}

fn read_node<E: Schema>(row: &Row) -> Result<Node<E>> {
    let id: NodeId = row.get(0)?;
    let name: String = row.get(1)?;
    let tree_id: Option<TreeId> = row.get(2)?;
    let depth: Option<Depth> = row.get(3)?;
    let position = E::position_from_row(row, 4)?;
    Ok(Node::restore(id, name, tree_id, position, depth))
}

fn record_id<E: Encoding>(node: &Node<E>) -> Result<NodeId> {
    node.id()
        .ok_or_else(|| NestsetError::Invariant(format!("{} was never persisted", node)))
}

impl<'c, E: Schema> UnitOfWork<E> for SqliteUnit<'c, E> {
    fn insert(&mut self, node: &mut Node<E>) -> Result<()> {
        let values = Self::record_values(node);
        let sql = format!(
            "insert into {} (Name, Tree_Identity, Depth, {}) values ({})",
            E::TABLE,
            E::POSITION_COLUMNS.join(", "),
            vec!["?"; values.len()].join(", ")
        );
        self.connection
            .prepare_cached(&sql)?
            .execute(params_from_iter(values.iter()))?;
        node.assign_id(self.connection.last_insert_rowid());
        Ok(())
    }
    fn update(&mut self, node: &Node<E>) -> Result<()> {
        let mut values = Self::record_values(node);
        values.push(Value::Integer(record_id(node)?));
        let assignments: Vec<String> = ["Name", "Tree_Identity", "Depth"]
            .iter()
            .chain(E::POSITION_COLUMNS)
            .map(|column| format!("{} = ?", column))
            .collect();
        let sql = format!(
            "update {} set {} where Node_Identity = ?",
            E::TABLE,
            assignments.join(", ")
        );
        let changed = self
            .connection
            .prepare_cached(&sql)?
            .execute(params_from_iter(values.iter()))?;
        self.expect_one(changed, node)
    }
    fn delete(&mut self, node: &Node<E>) -> Result<()> {
        let sql = format!("delete from {} where Node_Identity = ?", E::TABLE);
        let changed = self
            .connection
            .prepare_cached(&sql)?
            .execute([record_id(node)?])?;
        self.expect_one(changed, node)
    }
    fn get(&mut self, id: NodeId) -> Result<Option<Node<E>>> {
        let sql = format!("{} where Node_Identity = ?", Self::select());
        Ok(self.fetch(&sql, &[Value::Integer(id)])?.pop())
    }
    fn query(&mut self, tree_id: TreeId, predicate: &Predicate<E>) -> Result<Vec<Node<E>>> {
        let (condition, mut values) = E::filter(predicate);
        values.insert(0, Value::Integer(tree_id));
        let sql = format!(
            "{} where Tree_Identity = ? and {} order by {}",
            Self::select(),
            condition,
            E::ORDERING
        );
        let mut nodes = self.fetch(&sql, &values)?;
        nodes.retain(|node| {
            node.placement()
                .is_some_and(|(_, position, depth)| predicate.matches(position, depth))
        });
        nodes.sort_by(E::document_order);
        Ok(nodes)
    }
    fn find_by_name(&mut self, name: &str) -> Result<Option<Node<E>>> {
        let sql = format!(
            "{} where Name = ? order by Node_Identity limit 1",
            Self::select()
        );
        Ok(self.fetch(&sql, &[Value::Text(name.to_string())])?.pop())
    }
    fn count(&mut self) -> Result<u64> {
        let sql = format!("select count(*) from {}", E::TABLE);
        let count: u64 = self.connection.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }
}
