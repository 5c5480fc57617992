use sqlite_tutorial::{
    models::{self, Address, Model, User},
    schema::{self, ColumnInfo, ForeignKeyInfo},
    Engine, Error, Result, SqlQuery, SqliteConfig,
};

// Helper function to create an in-memory engine with the mapped tables
fn create_test_engine() -> Result<Engine> {
    let engine = Engine::in_memory()?;
    models::metadata().create_all(&engine)?;
    Ok(engine)
}

fn column(name: &str, declared_type: &str, not_null: bool, primary_key: bool) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        declared_type: declared_type.to_string(),
        not_null,
        primary_key,
    }
}

#[test]
fn test_catalog_lists_declared_tables() {
    test_catalog_lists_declared_tables_impl().unwrap();
}

fn test_catalog_lists_declared_tables_impl() -> Result<()> {
    let engine = create_test_engine()?;
    let mut conn = engine.connect();

    assert_eq!(schema::table_names(&mut conn)?, ["address", "user_account"]);
    assert_eq!(
        schema::columns(&mut conn, "user_account")?,
        vec![
            column("id", "INTEGER", true, true),
            column("name", "VARCHAR(30)", true, false),
            column("fullname", "VARCHAR", false, false),
        ]
    );
    assert_eq!(
        schema::columns(&mut conn, "address")?,
        vec![
            column("id", "INTEGER", true, true),
            column("email_address", "VARCHAR", true, false),
            column("user_id", "INTEGER", false, false),
        ]
    );
    assert_eq!(
        schema::foreign_keys(&mut conn, "address")?,
        vec![ForeignKeyInfo {
            column: "user_id".to_string(),
            foreign_table: "user_account".to_string(),
            foreign_column: "id".to_string(),
        }]
    );
    assert!(schema::foreign_keys(&mut conn, "user_account")?.is_empty());
    Ok(())
}

#[test]
fn test_create_all_is_idempotent() {
    test_create_all_is_idempotent_impl().unwrap();
}

fn test_create_all_is_idempotent_impl() -> Result<()> {
    let engine = create_test_engine()?;
    engine.begin(|conn| {
        models::insert(conn, &User::new("squidward"))?;
        Ok(())
    })?;

    models::metadata().create_all(&engine)?;

    let mut conn = engine.connect();
    assert_eq!(schema::table_names(&mut conn)?.len(), 2);
    let kept: Option<User> = models::get(&mut conn, 1)?;
    assert_eq!(kept.map(|u| u.name), Some("squidward".to_string()));
    Ok(())
}

#[test]
fn test_address_resolves_back_to_its_user() {
    test_address_resolves_back_to_its_user_impl().unwrap();
}

fn test_address_resolves_back_to_its_user_impl() -> Result<()> {
    let engine = create_test_engine()?;

    let mut user = User::new("spongebob").with_fullname("Spongebob Squarepants");
    user.add_address(Address::new("spongebob@bikinibottom.org"));
    let saved = engine.begin(|conn| user.save(conn))?;
    user.apply(&saved);
    let user_id = saved.user_id;
    assert_eq!(user.id, Some(user_id));
    assert_eq!(user.addresses[0].id, Some(saved.address_ids[0]));

    let mut conn = engine.connect();
    let addresses: Vec<Address> = models::select_where(&mut conn, Default::default())?;
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].email_address, "spongebob@bikinibottom.org");
    assert_eq!(addresses[0].user_id, Some(user_id));

    let owner = addresses[0].user(&mut conn)?.expect("address has an owner");
    assert_eq!(owner.id, Some(user_id));
    assert_eq!(owner.name, "spongebob");
    assert_eq!(owner.fullname.as_deref(), Some("Spongebob Squarepants"));
    Ok(())
}

#[test]
fn test_load_addresses_returns_collection_in_id_order() {
    test_load_addresses_returns_collection_in_id_order_impl().unwrap();
}

fn test_load_addresses_returns_collection_in_id_order_impl() -> Result<()> {
    let engine = create_test_engine()?;
    let mut conn = engine.connect();

    let mut sandy = User::new("sandy").with_fullname("Sandy Cheeks");
    sandy.add_address(Address::new("sandy@bikinibottom.org"));
    sandy.add_address(Address::new("sandy@squirrelpower.org"));
    let saved = sandy.save(&mut conn)?;
    conn.commit()?;
    sandy.apply(&saved);

    let mut patrick = User::new("patrick");
    let saved = patrick.save(&mut conn)?;
    conn.commit()?;
    patrick.apply(&saved);
    patrick.add_address(Address::new("patrick@rock.org"));
    let saved = patrick.save(&mut conn)?;
    conn.commit()?;
    patrick.apply(&saved);
    assert_eq!(saved.address_ids.len(), 1);

    let mut reloaded: User = models::get(&mut conn, sandy.id.unwrap())?.unwrap();
    assert!(reloaded.addresses.is_empty());
    reloaded.load_addresses(&mut conn)?;
    let emails: Vec<&str> = reloaded
        .addresses
        .iter()
        .map(|a| a.email_address.as_str())
        .collect();
    assert_eq!(emails, ["sandy@bikinibottom.org", "sandy@squirrelpower.org"]);
    assert!(reloaded
        .addresses
        .iter()
        .all(|a| a.user_id == sandy.id && a.id.is_some()));

    let mut patrick_again: User = models::get(&mut conn, patrick.id.unwrap())?.unwrap();
    patrick_again.load_addresses(&mut conn)?;
    assert_eq!(patrick_again.addresses.len(), 1);
    Ok(())
}

#[test]
fn test_unassigned_address_has_no_user() {
    let engine = create_test_engine().unwrap();
    let mut conn = engine.connect();
    let mut address = Address::new("nobody@nowhere.org");
    let id = models::insert(&mut conn, &address).unwrap();
    address.set_id(id);
    assert!(address.id.is_some());
    assert_eq!(address.user(&mut conn).unwrap(), None);
}

#[test]
fn test_dangling_user_reference_is_rejected() {
    let engine = create_test_engine().unwrap();
    let outcome = engine.begin(|conn| {
        let mut address = Address::new("ghost@bikinibottom.org");
        address.user_id = Some(404);
        models::insert(conn, &address)
    });
    assert!(matches!(outcome, Err(Error::Sqlite(_))));

    let mut conn = engine.connect();
    let addresses: Vec<Address> = models::select_where(&mut conn, Default::default()).unwrap();
    assert!(addresses.is_empty());
}

fn foreign_keys_pragma(engine: &Engine) -> i64 {
    let mut conn = engine.connect();
    let result = conn.execute(&SqlQuery::new("PRAGMA foreign_keys")).unwrap();
    result.first().unwrap().get_index(0).unwrap()
}

#[test]
fn test_foreign_keys_setting_is_applied_both_ways() {
    let on = Engine::new(SqliteConfig::in_memory().with_foreign_keys(true)).unwrap();
    assert_eq!(foreign_keys_pragma(&on), 1);
    let off = Engine::new(SqliteConfig::in_memory().with_foreign_keys(false)).unwrap();
    assert_eq!(foreign_keys_pragma(&off), 0);
}

#[test]
fn test_foreign_keys_can_be_left_off() {
    let engine = Engine::new(SqliteConfig::in_memory().with_foreign_keys(false)).unwrap();
    models::metadata().create_all(&engine).unwrap();
    let stored = engine.begin(|conn| {
        let mut address = Address::new("ghost@bikinibottom.org");
        address.user_id = Some(404);
        models::insert(conn, &address)
    });
    assert!(stored.is_ok());
}

#[test]
fn test_table_definitions_match_mapped_columns() {
    assert_eq!(
        User::table_definition().column_names(),
        ["id", "name", "fullname"]
    );
    assert_eq!(
        Address::table_definition().column_names(),
        ["id", "email_address", "user_id"]
    );
    assert_eq!(User::TABLE, "user_account");
    assert_eq!(Address::TABLE, "address");
}

#[test]
fn test_rolled_back_save_leaves_user_unsaved() {
    test_rolled_back_save_leaves_user_unsaved_impl().unwrap();
}

fn test_rolled_back_save_leaves_user_unsaved_impl() -> Result<()> {
    let engine = create_test_engine()?;
    let mut user = User::new("plankton");
    user.add_address(Address::new("plankton@chumbucket.org"));

    let failed: Result<()> = engine.begin(|conn| {
        user.save(conn)?;
        Err(Error::MissingParameter("abort".to_string()))
    });
    assert!(failed.is_err());
    assert_eq!(user.id, None);
    assert_eq!(user.addresses[0].id, None);
    assert_eq!(user.addresses[0].user_id, None);

    // saving again after the rollback stores both rows
    let saved = engine.begin(|conn| user.save(conn))?;
    user.apply(&saved);

    let mut conn = engine.connect();
    let stored: User = models::get(&mut conn, saved.user_id)?.expect("user was stored");
    assert_eq!(stored.name, "plankton");
    let addresses: Vec<Address> = models::select_where(&mut conn, Default::default())?;
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].user_id, user.id);
    Ok(())
}
