use domains::{DomainError, PostRepository};
use integration_tests::{png, Harness};
use services::forms::{CommentForm, PostForm};
use tokio_test::{assert_err, assert_ok};

fn form(content: &str) -> PostForm {
    PostForm { title: None, content: content.into() }
}

#[tokio::test]
async fn detached_images_are_swept_and_destroyed() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let post = h.post(&alice, "two pictures", 2).await;
    let (gone, kept) = (&post.images[0], &post.images[1]);

    let edited = assert_ok!(h.posts.edit(&alice, post.id, form("one picture"), vec![gone.id], vec![]).await).value;

    assert_eq!(edited.content, "one picture");
    assert_eq!(edited.images.iter().map(|i| i.id).collect::<Vec<_>>(), vec![kept.id]);
    assert_eq!(h.media.destroyed(), vec![gone.public_id.clone()]);

    let dump = h.admin.records("images").await.unwrap();
    assert_eq!(dump.rows.len(), 1);
}

#[tokio::test]
async fn replacing_every_image_keeps_the_post() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let post = h.post(&alice, "swap", 1).await;

    let edited = h
        .posts
        .edit(&alice, post.id, form("swap"), vec![post.images[0].id], vec![png("fresh.png")])
        .await
        .unwrap()
        .value;

    assert_eq!(edited.images.len(), 1);
    assert_ne!(edited.images[0].id, post.images[0].id);
    assert!(edited.images[0].public_id.ends_with("fresh.png"));
    assert_eq!(h.media.destroyed(), vec![post.images[0].public_id.clone()]);
}

#[tokio::test]
async fn an_edit_cannot_leave_a_post_without_images() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let post = h.post(&alice, "only one", 1).await;

    let err = assert_err!(h.posts.edit(&alice, post.id, form("none left"), vec![post.images[0].id], vec![]).await);

    assert_eq!(err, DomainError::validation("At least one image is required."));
    assert!(h.media.destroyed().is_empty());
}

#[tokio::test]
async fn removing_the_last_image_directly_sweeps_the_post_and_its_comments() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;
    let admin = h.admin().await;
    let post = h.post(&alice, "fragile", 1).await;
    h.comments
        .add(&admin, post.id, CommentForm { content: "noted".into(), reply_to: None })
        .await
        .unwrap();

    let image_id = post.images[0].id;
    assert_ok!(h.admin.delete_one("images", image_id).await);

    assert!(PostRepository::find_by_id(h.store.as_ref(), post.id).await.unwrap().is_none());
    assert!(h.admin.records("comments").await.unwrap().rows.is_empty());
    assert_eq!(h.media.destroyed(), vec![post.images[0].public_id.clone()]);
}
