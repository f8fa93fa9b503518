use inkwell_app::prelude::*;
use inkwell_app::{MemoryPostStorage, UserDirectory};
use std::sync::Arc;

struct Fixture {
    manager: PostManager,
    alice: User,
    bob: User,
    carol: User,
    admin: User,
}

async fn fixture() -> Fixture {
    let storage = Arc::new(MemoryPostStorage::new());
    let manager = PostManager::new(storage.clone(), storage);

    Fixture {
        alice: manager.register_user("alice@example.com", false).await.unwrap(),
        bob: manager.register_user("bob@example.com", false).await.unwrap(),
        carol: manager.register_user("carol@example.com", false).await.unwrap(),
        admin: manager.register_user("admin@example.com", true).await.unwrap(),
        manager,
    }
}

fn post_request(title: &str, restricted: bool, collaborators: &[&str]) -> NewPost {
    NewPost {
        title: title.to_string(),
        content: "The sun seems to like me very much these days.".to_string(),
        restricted,
        collaborator_emails: Some(collaborators.iter().map(|e| e.to_string()).collect()),
    }
}

fn ability(user: &User) -> Ability {
    Ability::for_user(Some(&CurrentUser::from(user)))
}

#[tokio::test]
async fn anonymous_reads_open_post_but_cannot_edit() {
    let f = fixture().await;
    let post = f
        .manager
        .create(f.alice.id, post_request("Hot Day", false, &[]))
        .await
        .unwrap();

    let anonymous = Ability::for_user(None);
    assert!(anonymous.can_perform(Action::Show, &post));
    assert!(!anonymous.can_perform(Action::Edit, &post));
}

#[tokio::test]
async fn anonymous_cannot_see_restricted_post() {
    let f = fixture().await;
    let post = f
        .manager
        .create(f.alice.id, post_request("Diary", true, &[]))
        .await
        .unwrap();

    let anonymous = Ability::for_user(None);
    assert!(!anonymous.can_perform(Action::Index, &post));
    assert!(!anonymous.can_perform(Action::Show, &post));
}

#[tokio::test]
async fn collaborator_may_show_and_edit_but_not_destroy() {
    let f = fixture().await;
    let post = f
        .manager
        .create(f.alice.id, post_request("Diary", true, &["bob@example.com"]))
        .await
        .unwrap();

    let bob = ability(&f.bob);
    assert!(bob.can_perform(Action::Show, &post));
    assert!(bob.can_perform(Action::Edit, &post));
    assert!(!bob.can_perform(Action::Destroy, &post));
}

#[tokio::test]
async fn stranger_is_denied_everything_on_restricted_post() {
    let f = fixture().await;
    let post = f
        .manager
        .create(f.alice.id, post_request("Diary", true, &["bob@example.com"]))
        .await
        .unwrap();

    let carol = ability(&f.carol);
    for action in [Action::Index, Action::Show, Action::Edit, Action::Destroy] {
        assert!(carol.cannot_perform(action, &post), "{}", action);
    }
}

#[tokio::test]
async fn admin_may_do_everything_in_any_state() {
    let f = fixture().await;
    let open = f
        .manager
        .create(f.alice.id, post_request("Open", false, &[]))
        .await
        .unwrap();
    let restricted = f
        .manager
        .create(f.bob.id, post_request("Closed", true, &["carol@example.com"]))
        .await
        .unwrap();

    let admin = ability(&f.admin);
    assert_eq!(admin.identity(), Identity::Admin(f.admin.id));
    for post in [&open, &restricted] {
        for action in Action::ALL {
            assert!(admin.can_perform(action, post));
        }
    }
}

#[tokio::test]
async fn setting_collaborators_twice_is_idempotent() {
    let f = fixture().await;
    let mut post = f
        .manager
        .create(f.alice.id, post_request("Shared", false, &[]))
        .await
        .unwrap();
    let emails = vec![
        "bob@example.com".to_string(),
        "carol@example.com".to_string(),
        "bob@example.com".to_string(),
    ];

    f.manager
        .set_collaborators_by_email(&mut post, &emails)
        .await
        .unwrap();
    let first = post.collaborations.clone();
    f.manager
        .set_collaborators_by_email(&mut post, &emails)
        .await
        .unwrap();

    assert_eq!(first, post.collaborations);
    assert_eq!(post.collaborator_ids(), vec![f.bob.id, f.carol.id]);
}

#[tokio::test]
async fn collaborators_are_replaced_not_merged() {
    let f = fixture().await;
    let post = f
        .manager
        .create(f.alice.id, post_request("Shared", true, &["bob@example.com"]))
        .await
        .unwrap();

    let post = f
        .manager
        .replace_collaborators_by_email(post.id, &["carol@example.com".to_string()])
        .await
        .unwrap();

    assert_eq!(post.collaborator_ids(), vec![f.carol.id]);
    assert!(ability(&f.bob).cannot_perform(Action::Show, &post));
    assert!(ability(&f.carol).can_perform(Action::Update, &post));
}

#[tokio::test]
async fn unknown_collaborator_emails_are_silently_ignored() {
    let f = fixture().await;
    let post = f
        .manager
        .create(
            f.alice.id,
            post_request("Shared", true, &["nobody@example.com", "", "carol@example.com"]),
        )
        .await
        .unwrap();

    assert_eq!(post.collaborator_ids(), vec![f.carol.id]);
    assert!(f
        .manager
        .users()
        .find_users_by_email(&["nobody@example.com".to_string()])
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn listing_is_scoped_and_narrowed() {
    let f = fixture().await;
    let open = f
        .manager
        .create(f.alice.id, post_request("Open", false, &[]))
        .await
        .unwrap();
    let shared = f
        .manager
        .create(f.alice.id, post_request("Shared", true, &["bob@example.com"]))
        .await
        .unwrap();
    let bobs = f
        .manager
        .create(f.bob.id, post_request("Bob's", true, &[]))
        .await
        .unwrap();

    let ids = |posts: Vec<Post>| posts.into_iter().map(|p| p.id).collect::<Vec<_>>();

    let everything = PostListing::default();
    assert_eq!(
        ids(f.manager.list(&ability(&f.bob), &everything).await.unwrap()),
        vec![open.id, shared.id, bobs.id]
    );
    assert_eq!(
        ids(f.manager.list(&ability(&f.carol), &everything).await.unwrap()),
        vec![open.id]
    );

    let alices_shared = PostListing {
        created_by: Some(f.alice.id),
        with_collaborators: true,
    };
    assert_eq!(
        ids(f.manager.list(&ability(&f.bob), &alices_shared).await.unwrap()),
        vec![shared.id]
    );
    assert!(f
        .manager
        .list(&ability(&f.carol), &alices_shared)
        .await
        .unwrap()
        .is_empty());
}
